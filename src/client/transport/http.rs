use std::time::Duration;

use tracing::trace;
use ureq::Agent;

use super::{BodyStream, Method, Reply, Request, ResponseMeta, Transport, CONTENT_TYPE_JSON};
use crate::Result;

/// [`Transport`] backed by blocking `ureq` agents.
///
/// One-shot exchanges are bound by `timeout` unless the request carries its
/// own. Streams only bound the wait for the response head; reading the body
/// is left to the caller's idle handling.
pub struct Http {
    agent: Agent,
    stream_agent: Agent,
    max_response_size: u64,
}

impl Http {
    pub fn new(
        timeout: Option<Duration>,
        connect_timeout: Option<Duration>,
        max_response_size: u64,
    ) -> Self {
        let agent = Agent::new_with_config(
            Agent::config_builder()
                .http_status_as_error(false)
                .timeout_global(timeout)
                .timeout_connect(connect_timeout)
                .build(),
        );

        let stream_agent = Agent::new_with_config(
            Agent::config_builder()
                .http_status_as_error(false)
                .timeout_connect(connect_timeout)
                .timeout_recv_response(timeout)
                .build(),
        );

        Http {
            agent,
            stream_agent,
            max_response_size,
        }
    }

    fn call(agent: &Agent, req: &Request) -> Result<ureq::http::Response<ureq::Body>> {
        let resp = match req.method {
            Method::Get => {
                let mut builder = agent.get(&req.url);
                if let Some(timeout) = req.timeout {
                    builder = builder.config().timeout_global(Some(timeout)).build();
                }
                builder.call()?
            }
            Method::Post => {
                let mut builder = agent.post(&req.url);
                if let Some(timeout) = req.timeout {
                    builder = builder.config().timeout_global(Some(timeout)).build();
                }
                match req.body.as_ref() {
                    Some(body) => builder
                        .header("Content-Type", CONTENT_TYPE_JSON)
                        .send(&body[..])?,
                    None => builder.send_empty()?,
                }
            }
        };

        Ok(resp)
    }
}

fn meta_of(resp: &ureq::http::Response<ureq::Body>) -> ResponseMeta {
    ResponseMeta {
        status: resp.status().as_u16(),
        content_type: resp
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned),
    }
}

impl Transport for Http {
    fn send(&self, req: &Request) -> Result<Reply> {
        let resp = Self::call(&self.agent, req)?;
        let meta = meta_of(&resp);
        let body = resp
            .into_body()
            .into_with_config()
            .limit(self.max_response_size)
            .read_to_vec()?;

        trace!(url = req.url.as_str(), status = meta.status, size = body.len(), "http reply");
        Ok(Reply { body, meta })
    }

    fn open_stream(&self, req: &Request) -> Result<(ResponseMeta, BodyStream)> {
        let resp = Self::call(&self.stream_agent, req)?;
        let meta = meta_of(&resp);
        trace!(url = req.url.as_str(), status = meta.status, "http stream opened");
        Ok((meta, Box::new(resp.into_body().into_reader())))
    }
}
