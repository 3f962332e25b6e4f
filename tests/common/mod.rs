//! In-process stand-in for a WebAdvisor portal, shared by the fetcher and
//! command-line tests.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use wa::SiteConfig;

pub const TOKEN: &str = "8151";
pub const RESULTS: &str = include_str!("../fixtures/mat_sections.html");
pub const NO_RESULTS: &str = include_str!("../fixtures/no_sections.html");

#[derive(Debug, Clone)]
pub struct Request {
    pub method: String,
    pub target: String,
    pub body: String,
}

/// How the stand-in portal behaves.
#[derive(Clone)]
pub struct Portal {
    pub password: &'static str,
    pub hand_out_token: bool,
    pub search_status: u16,
    pub results: &'static str,
}

impl Default for Portal {
    fn default() -> Self {
        Portal {
            password: "hunter2",
            hand_out_token: true,
            search_status: 200,
            results: RESULTS,
        }
    }
}

struct Reply {
    status: u16,
    set_cookie: Option<String>,
    body: String,
}

impl Reply {
    fn ok(body: &str) -> Self {
        Reply {
            status: 200,
            set_cookie: None,
            body: body.into(),
        }
    }
}

fn menu() -> String {
    format!(
        r#"<html><body><ul>
        <li><a href="/WebAdvisor/WebAdvisor?TOKENIDX={TOKEN}&amp;SS=LGRQ">Log In</a></li>
        <li><a href="/WebAdvisor/WebAdvisor?TOKENIDX={TOKEN}&amp;SS=1">Search for Sections</a></li>
        </ul></body></html>"#
    )
}

impl Portal {
    fn reply(&self, req: &Request) -> Reply {
        let target = req.target.as_str();
        if req.method == "POST" {
            if target.contains("APP=ST") {
                return Reply {
                    status: self.search_status,
                    set_cookie: None,
                    body: self.results.into(),
                };
            }
            if target.contains("SS=LGRQ") {
                let expected = format!("USER.NAME=student&CURR.PWD={}", self.password);
                if req.body.contains(&expected) {
                    return Reply::ok(&menu());
                }
                return Reply::ok(
                    r#"<html><body><div class="errorText">You entered an invalid password.</div></body></html>"#,
                );
            }
            return Reply {
                status: 404,
                set_cookie: None,
                body: String::new(),
            };
        }

        if target.contains("SS=LGRQ") {
            Reply::ok(r#"<html><body><form method="POST"><input name="USER.NAME"></form></body></html>"#)
        } else if target.contains("SS=1") {
            Reply::ok(r#"<html><body><form name="datatelform" method="POST"></form></body></html>"#)
        } else if target.ends_with(&format!("TOKENIDX={TOKEN}")) {
            Reply::ok(&menu())
        } else if target.ends_with("TOKENIDX=") {
            Reply {
                status: 200,
                set_cookie: self
                    .hand_out_token
                    .then(|| format!("LASTTOKEN={TOKEN}; Path=/")),
                body: "<html><body>Redirecting</body></html>".into(),
            }
        } else {
            Reply::ok("<html><body>WebAdvisor</body></html>")
        }
    }
}

pub struct Server {
    addr: SocketAddr,
    log: Arc<Mutex<Vec<Request>>>,
}

impl Server {
    pub async fn start(portal: Portal) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));

        let requests = Arc::clone(&log);
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let portal = portal.clone();
                let requests = Arc::clone(&requests);
                tokio::spawn(async move {
                    serve(stream, &portal, &requests).await;
                });
            }
        });

        Server { addr, log }
    }

    pub fn url(&self) -> String {
        format!("http://{}/WebAdvisor/WebAdvisor", self.addr)
    }

    pub fn site(&self) -> SiteConfig {
        SiteConfig {
            url: self.url(),
            verify: true,
            requires_auth: false,
            default_term: "SP16R".into(),
            to_section: vec!["Search for Sections".into()],
            login_link: "Log In".into(),
            username: None,
            password: None,
            timeout_secs: 5,
            requests_per_second: 100,
        }
    }

    pub fn requests(&self) -> Vec<Request> {
        self.log.lock().unwrap().clone()
    }

    pub fn searches(&self) -> Vec<Request> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == "POST" && r.target.contains("APP=ST"))
            .collect()
    }
}

async fn serve(mut stream: TcpStream, portal: &Portal, log: &Mutex<Vec<Request>>) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let head_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let mut request_line = head.lines().next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default().to_string();
    let target = request_line.next().unwrap_or_default().to_string();
    let length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < head_end + length {
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
    let body = String::from_utf8_lossy(&buf[head_end..]).to_string();

    let request = Request {
        method,
        target,
        body,
    };
    let reply = portal.reply(&request);
    log.lock().unwrap().push(request);

    let mut response = format!(
        "HTTP/1.1 {} Stub\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n",
        reply.status,
        reply.body.len()
    );
    if let Some(cookie) = reply.set_cookie {
        response.push_str(&format!("Set-Cookie: {cookie}\r\n"));
    }
    response.push_str("\r\n");
    response.push_str(&reply.body);

    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.shutdown().await;
}
