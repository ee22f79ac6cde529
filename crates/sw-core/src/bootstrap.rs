//! In-page bootstrap script generator
//!
//! Open pages do not receive the content script directly. They receive a
//! small bootstrap that re-checks `location.hostname` against the compiled
//! host regexes and only then asks the background for the content script.
//! A page-global guard keeps a page from bootstrapping twice.

use crate::message::GET_CONTENT_SCRIPT;

/// Page-global flag set once a page has requested the content script.
pub const BOOTSTRAP_GUARD: &str = "__scanwatchBootstrap";

/// Build the bootstrap script for the given host regex sources.
pub fn build_bootstrap(regex_sources: &[String]) -> String {
    // Serializing a Vec<String> cannot fail.
    let hosts = serde_json::to_string(regex_sources).unwrap_or_else(|_| "[]".to_string());

    format!(
        r#"(function () {{
  if (window.{guard}) {{
    return;
  }}
  var hosts = {hosts};
  var hostname = document.location.hostname;
  var match = hosts.some(function (source) {{
    return new RegExp(source).test(hostname);
  }});
  if (!match) {{
    return;
  }}
  window.{guard} = true;
  chrome.runtime.sendMessage({{event: "{event}"}}, function (response) {{
    if (response && typeof response.code === "string") {{
      (0, eval)(response.code);
    }}
  }});
}})();
"#,
        guard = BOOTSTRAP_GUARD,
        hosts = hosts,
        event = GET_CONTENT_SCRIPT,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hosts::HostSet;
    use crate::patterns::CompiledPatterns;
    use rquickjs::{Context, Runtime};

    fn sources() -> Vec<String> {
        CompiledPatterns::compile(&HostSet::from_hosts(["mail.example.com"])).regex_sources()
    }

    /// What a page saw after running the bootstrap `runs` times.
    #[derive(Debug)]
    struct PageRun {
        sent: Vec<String>,
        evaluated: i32,
        guarded: bool,
    }

    /// Run `script` in a fresh page whose hostname is `hostname`. The stubbed
    /// `sendMessage` answers every request with code that bumps a counter.
    fn run_in_page(script: &str, hostname: &str, runs: usize) -> PageRun {
        let runtime = Runtime::new().unwrap();
        let context = Context::full(&runtime).unwrap();
        context.with(|ctx| {
            let page = format!(
                r#"
                var window = globalThis;
                var document = {{ location: {{ hostname: {hostname} }} }};
                var sent = [];
                var evaluated = 0;
                var chrome = {{
                  runtime: {{
                    sendMessage: function (message, callback) {{
                      sent.push(JSON.stringify(message));
                      callback({{ code: "evaluated += 1;" }});
                    }}
                  }}
                }};
                "#,
                hostname = serde_json::to_string(hostname).unwrap()
            );
            ctx.eval::<(), _>(page).unwrap();
            for _ in 0..runs {
                ctx.eval::<(), _>(script).unwrap();
            }
            PageRun {
                sent: ctx.eval("sent").unwrap(),
                evaluated: ctx.eval("evaluated").unwrap(),
                guarded: ctx.eval(format!("window.{} === true", BOOTSTRAP_GUARD)).unwrap(),
            }
        })
    }

    #[test]
    fn test_embeds_regex_sources_as_json() {
        let sources = sources();
        let script = build_bootstrap(&sources);
        let embedded = serde_json::to_string(&sources).unwrap();
        assert!(script.contains(&format!("var hosts = {};", embedded)));
        assert!(embedded.contains(r"mail\\.example\\.com"));
    }

    #[test]
    fn test_matching_page_requests_once_when_run_twice() {
        let run = run_in_page(&build_bootstrap(&sources()), "mail.example.com", 2);
        assert_eq!(run.sent, vec![r#"{"event":"get-cs"}"#]);
        assert_eq!(run.evaluated, 1);
        assert!(run.guarded);
    }

    #[test]
    fn test_subdomains_match() {
        let script = build_bootstrap(&sources());
        assert_eq!(run_in_page(&script, "eu-west.mail.example.com", 1).sent.len(), 1);
        assert_eq!(run_in_page(&script, "a.b-c.mail.example.com", 1).sent.len(), 1);
    }

    #[test]
    fn test_other_page_sends_nothing() {
        let script = build_bootstrap(&sources());
        for hostname in ["example.com", "mail.example.com.evil.net", "evilmail.example.com", ""] {
            let run = run_in_page(&script, hostname, 2);
            assert!(run.sent.is_empty(), "{} sent {:?}", hostname, run.sent);
            assert_eq!(run.evaluated, 0);
            assert!(!run.guarded);
        }
    }

    #[test]
    fn test_empty_sources_never_request() {
        let script = build_bootstrap(&[]);
        assert!(script.contains("var hosts = [];"));
        assert!(run_in_page(&script, "mail.example.com", 1).sent.is_empty());
    }

    #[test]
    fn test_guard_set_before_single_request() {
        let script = build_bootstrap(&sources());
        let guard_set = script.find(&format!("window.{} = true;", BOOTSTRAP_GUARD)).unwrap();
        let send = script.find("chrome.runtime.sendMessage").unwrap();
        assert!(guard_set < send);
        assert_eq!(script.matches("sendMessage").count(), 1);
    }
}
