//! Scripted request sequencing against one session.
//!
//! A flat instruction list is executed in order against a single
//! [`Session`]. A `Loop(n)` step repeats every loopable step that follows
//! it `n` times total, using bounded iteration with an explicit iteration
//! index and an aggregate-statistics accumulator.

use std::path::{Path, PathBuf};
use std::time::Duration;

use log::warn;

use crate::error::{Result, ScriptError};
use crate::session::{Exchange, ExchangeTotals, Session, find_text_in_file};

/// One driver instruction.
#[derive(Debug, Clone)]
pub enum Step {
    /// Connect to a `user:pass@host[:port]` URL.
    Connect(String),
    /// HELLO handshake with the built-in capability document.
    Hello,
    /// HELLO handshake from a document file, response persisted.
    HelloFile(PathBuf),
    /// Send a request file, response streamed to the derived path.
    SendFile(PathBuf),
    /// Pause before continuing.
    Sleep(f64),
    /// Set a substitution variable by bare name.
    SetVariable(String, String),
    /// Print the text of the named tag from the latest response file.
    GetTag(String),
    /// Commit staged candidate changes.
    Commit,
    /// Close the NETCONF session.
    Close,
    /// Repeat the loopable steps after this one `n` times total.
    Loop(u32),
    /// Prefix for derived response paths; `${i}` expands to the
    /// loop-iteration index.
    ResponsePrefix(String),
    /// Discard responses instead of persisting them.
    NoResponses,
}

impl Step {
    /// Whether a loop repeats this step on later iterations.
    fn is_loopable(&self) -> bool {
        matches!(
            self,
            Step::SendFile(_)
                | Step::Sleep(_)
                | Step::GetTag(_)
                | Step::ResponsePrefix(_)
                | Step::NoResponses
        )
    }
}

/// Derive the response path for a request file.
fn response_path(prefix: &str, request: &Path, index: u32) -> PathBuf {
    let base = request
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    PathBuf::from(format!("{prefix}{base}").replace("${i}", &format!("{index:03}")))
}

/// Sequential executor for a [`Step`] list.
pub struct ScriptRunner {
    session: Option<Session>,
    /// `None` discards responses instead of writing files.
    response_prefix: Option<String>,
    last_response: Option<PathBuf>,
    human_readable: bool,
}

impl Default for ScriptRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptRunner {
    pub fn new() -> Self {
        Self {
            session: None,
            response_prefix: Some("rs-".to_string()),
            last_response: None,
            human_readable: false,
        }
    }

    /// Format counts and durations du-style in the report lines.
    pub fn human_readable(mut self, on: bool) -> Self {
        self.human_readable = on;
        self
    }

    /// Run the instruction list to completion, then stop the transport.
    ///
    /// Connect-phase failures abort the run; every other operation failure
    /// is reported with its metrics and the run continues.
    pub async fn run(&mut self, steps: &[Step]) -> Result<()> {
        let mut loop_count = 0u32;
        let mut recorded: Vec<Step> = Vec::new();
        let mut totals = ExchangeTotals::default();

        for step in steps {
            if let Step::Loop(n) = step {
                loop_count = *n;
                self.report("LOOP", &format!("REPEAT {n} x"), Some("START"));
                continue;
            }
            if loop_count > 0 && step.is_loopable() {
                recorded.push(step.clone());
            }
            self.exec(step, 1, loop_count > 0, &mut totals).await?;
        }

        for index in 2..=loop_count {
            for step in recorded.clone() {
                self.exec(&step, index, true, &mut totals).await?;
            }
        }
        if loop_count > 0 {
            let summary = totals.as_exchange();
            self.report_exchange("LOOP", "=== SUMMARY.STATS ===", &summary, "");
        }

        if let Some(session) = self.session.as_mut() {
            session.terminate();
        }
        Ok(())
    }

    async fn exec(
        &mut self,
        step: &Step,
        index: u32,
        in_loop: bool,
        totals: &mut ExchangeTotals,
    ) -> Result<()> {
        match step {
            Step::Connect(url) => {
                let mut session = Session::from_url(url)?;
                self.report("CONNECT", url, None);
                match session.connect().await? {
                    None => self.report("CONNECT", url, Some("OK")),
                    Some(failure) => {
                        self.report("CONNECT", url, Some(&format!("FAIL - {failure}")));
                        return Err(ScriptError::ConnectFailed(failure.to_string()).into());
                    }
                }
                self.session = Some(session);
            }

            Step::Hello => {
                let session = self.session.as_mut().ok_or(ScriptError::NoSession)?;
                let ex = session.hello().await;
                let err = session.last_error().to_string();
                let par = format!("session_id={}", ex.status);
                self.report_exchange("HELLO", &par, &ex, &err);
            }

            Step::HelloFile(request) => {
                let response = self.derived_response(request, index);
                let session = self.session.as_mut().ok_or(ScriptError::NoSession)?;
                let ex = session.hello_file(request, response.as_deref()).await;
                let err = session.last_error().to_string();
                self.last_response = response;
                let par = format!("session_id={}", ex.status);
                self.report_exchange("HELLO", &par, &ex, &err);
            }

            Step::SendFile(request) => {
                let response = self.derived_response(request, index);
                let session = self.session.as_mut().ok_or(ScriptError::NoSession)?;
                let ex = session.request_file(request, response.as_deref()).await;
                let err = session.last_error().to_string();

                let oper = if in_loop { format!("{index:>2}. FILE") } else { "FILE".to_string() };
                let target = response
                    .as_deref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "/dev/null".to_string());
                let par = format!("{} -> {}", request.display(), target);
                self.report_exchange(&oper, &par, &ex, &err);

                self.last_response = response;
                if in_loop {
                    totals.add(&ex);
                }
            }

            Step::Sleep(seconds) => {
                self.report("SLEEP", &format!("for {seconds:.2} sec"), None);
                tokio::time::sleep(Duration::from_secs_f64(seconds.max(0.0))).await;
            }

            Step::SetVariable(name, value) => {
                let session = self.session.as_mut().ok_or(ScriptError::NoSession)?;
                session.set_variable(name, value.clone());
                self.report("VAR", &format!("${{{name}}} = {value}"), Some("SET"));
            }

            Step::GetTag(tag) => match &self.last_response {
                Some(path) => {
                    let value = find_text_in_file(path, tag);
                    let par = format!("{tag} = {}", value.as_deref().unwrap_or("none"));
                    self.report("TAG", &par, Some("GET"));
                }
                None => {
                    warn!("GetTag({tag}) with no stored response");
                    self.report("TAG", "Missing response", Some("WARNING"));
                }
            },

            Step::Commit => {
                let session = self.session.as_mut().ok_or(ScriptError::NoSession)?;
                let ex = session.commit().await;
                let err = session.last_error().to_string();
                let par = ex.status.clone();
                self.report_exchange("COMMIT", &par, &ex, &err);
            }

            Step::Close => {
                let session = self.session.as_mut().ok_or(ScriptError::NoSession)?;
                let ex = session.close_session().await;
                let err = session.last_error().to_string();
                let par = ex.status.clone();
                self.report_exchange("CLOSE", &par, &ex, &err);
            }

            Step::ResponsePrefix(prefix) => {
                self.response_prefix = Some(prefix.clone());
            }

            Step::NoResponses => {
                self.response_prefix = None;
            }

            // Handled by run() before dispatch.
            Step::Loop(_) => {}
        }
        Ok(())
    }

    fn derived_response(&self, request: &Path, index: u32) -> Option<PathBuf> {
        let prefix = self.response_prefix.as_ref()?;
        Some(response_path(prefix, request, index))
    }

    fn report(&self, oper: &str, par: &str, res: Option<&str>) {
        match res {
            Some(res) => println!("{oper:>10}: {par:>40} ... {res}"),
            None => println!("{oper:>10}: {par:>40}"),
        }
    }

    fn report_exchange(&self, oper: &str, par: &str, ex: &Exchange, err: &str) {
        let err = if err.is_empty() {
            String::new()
        } else {
            format!(" - {err}")
        };
        println!(
            "{oper:>10}: {par:>40} {}{err}",
            ex.metrics_line(self.human_readable)
        );
    }
}
