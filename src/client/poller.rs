use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, trace};

use super::{executor::Executor, transport::Reply};
use crate::{
    proto::{CommandHead, CommandState},
    Error, Result,
};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// How a command still in progress is polled.
#[derive(Debug, Clone)]
pub struct PollPolicy {
    pub interval: Duration,
    /// `None` polls until the command reaches a terminal state.
    pub max_polls: Option<usize>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_polls: None,
        }
    }
}

/// The id to poll next, if the reply says the command is still running.
fn pending_id(reply: &Reply) -> Option<String> {
    let head = CommandHead::peek(&reply.body)?;
    match head.state {
        CommandState::InProgress => head.id,
        CommandState::Done | CommandState::Error => None,
    }
}

/// Drives the first reply of an `execute` in `chain` to a terminal reply.
///
/// Replies that are not command responses, and in-progress replies without
/// an id, are returned as they are.
pub(crate) fn wait_done(
    exec: &Arc<Executor>,
    policy: &PollPolicy,
    chain: u64,
    first: Result<Reply>,
) -> Result<Reply> {
    let mut reply = first?;
    let mut polls = 0;

    while let Some(id) = pending_id(&reply) {
        if let Some(max) = policy.max_polls {
            if polls >= max {
                debug!(chain, id = id.as_str(), polls, "poll limit reached");
                return Err(Error::PollLimit { polls });
            }
        }

        thread::sleep(policy.interval);
        polls += 1;

        trace!(chain, id = id.as_str(), polls, "polling command status");
        reply = exec.call_in_chain(chain, exec.status_request(&id))?;
    }

    Ok(reply)
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use crossbeam_channel::bounded;

    use super::*;
    use crate::client::{
        executor::Handler,
        transport::mock::{json, Scripted, Step},
        Endpoint,
    };

    fn fast() -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(20),
            max_polls: None,
        }
    }

    fn run(script: Scripted, policy: PollPolicy) -> (Arc<Scripted>, Vec<Result<Reply>>) {
        let script = Arc::new(script);
        let exec = Arc::new(Executor::new(
            Endpoint::new("192.168.1.1", 80),
            script.clone(),
        ));

        let (tx, rx) = bounded(4);
        let poll_exec = exec.clone();
        exec.dispatch_chained(exec.execute_request("camera.takePicture", None), move |chain| -> Handler {
            Box::new(move |first| {
                let _ = tx.send(wait_done(&poll_exec, &policy, chain, first));
            })
        });

        let mut results = vec![rx.recv().expect("handler called")];
        // the handler is never called twice
        while let Ok(more) = rx.recv_timeout(Duration::from_millis(50)) {
            results.push(more);
        }
        (script, results)
    }

    #[test]
    fn terminal_first_reply_is_not_polled() {
        for state in ["done", "error"] {
            let body = format!(r#"{{"name":"camera.takePicture","state":"{}"}}"#, state);
            let (script, results) = run(Scripted::new([Step::Reply(json(&body))]), fast());

            assert_eq!(results.len(), 1);
            let reply = results.into_iter().next().expect("one").expect("ok");
            assert_eq!(reply.body, body.as_bytes().to_vec());
            assert_eq!(script.paths(), vec!["/osc/commands/execute"]);
        }
    }

    #[test]
    fn in_progress_is_polled_with_same_id() {
        let started = Instant::now();
        let (script, results) = run(
            Scripted::new([
                Step::Reply(json(r#"{"name":"camera.takePicture","state":"inProgress","id":"7"}"#)),
                Step::Reply(json(r#"{"name":"camera.takePicture","state":"inProgress","id":"7","progress":{"completion":0.4}}"#)),
                Step::Reply(json(r#"{"name":"camera.takePicture","state":"inProgress","id":"7"}"#)),
                Step::Reply(json(r#"{"name":"camera.takePicture","state":"done","results":{"fileUri":"100RICOH/R0010001.JPG"}}"#)),
            ]),
            fast(),
        );

        assert!(started.elapsed() >= Duration::from_millis(60));
        assert_eq!(results.len(), 1);
        let reply = results.into_iter().next().expect("one").expect("ok");
        assert!(String::from_utf8_lossy(&reply.body).contains("R0010001.JPG"));

        assert_eq!(
            script.paths(),
            vec![
                "/osc/commands/execute",
                "/osc/commands/status",
                "/osc/commands/status",
                "/osc/commands/status",
            ]
        );
        for req in &script.requests()[1..] {
            assert_eq!(req.body.as_deref(), Some(&br#"{"id":"7"}"#[..]));
        }
    }

    #[test]
    fn in_progress_without_id_is_delivered() {
        let body = r#"{"name":"camera.takePicture","state":"inProgress"}"#;
        let (script, results) = run(Scripted::new([Step::Reply(json(body))]), fast());
        assert_eq!(results.len(), 1);
        assert_eq!(
            results.into_iter().next().expect("one").expect("ok").body,
            body.as_bytes().to_vec()
        );
        assert_eq!(script.requests().len(), 1);
    }

    #[test]
    fn malformed_reply_passes_through() {
        let (script, results) = run(Scripted::new([Step::Reply(json("not json"))]), fast());
        let reply = results.into_iter().next().expect("one").expect("ok");
        assert_eq!(reply.body, b"not json".to_vec());
        assert_eq!(script.requests().len(), 1);
    }

    #[test]
    fn poll_failure_stops_polling() {
        let (script, results) = run(
            Scripted::new([
                Step::Reply(json(r#"{"name":"camera.takePicture","state":"inProgress","id":"7"}"#)),
                Step::Fail("connection reset"),
                Step::Reply(json(r#"{"name":"camera.takePicture","state":"done"}"#)),
            ]),
            fast(),
        );

        assert_eq!(results.len(), 1);
        assert!(matches!(results[0], Err(Error::IO(_))));
        assert_eq!(script.requests().len(), 2);
    }

    #[test]
    fn poll_limit() {
        let in_progress = r#"{"name":"camera.takePicture","state":"inProgress","id":"7"}"#;
        let (script, results) = run(
            Scripted::new([
                Step::Reply(json(in_progress)),
                Step::Reply(json(in_progress)),
                Step::Reply(json(in_progress)),
            ]),
            PollPolicy {
                interval: Duration::from_millis(5),
                max_polls: Some(2),
            },
        );

        assert!(matches!(results[0], Err(Error::PollLimit { polls: 2 })));
        assert_eq!(script.requests().len(), 3);
    }
}
