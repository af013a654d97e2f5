use searchsign_core::{Context, StaticEnv};
use searchsign_file_read_tokio::TokioFileRead;
use searchsign_http_send_reqwest::ReqwestHttpSend;
use std::collections::HashMap;

/// Build a context that reads real files and sends real http requests, but
/// only sees the given environment.
pub fn context_with_envs<const N: usize>(envs: [(&str, &str); N]) -> Context {
    Context::new()
        .with_file_read(TokioFileRead)
        .with_http_send(ReqwestHttpSend::default())
        .with_env(StaticEnv {
            home_dir: None,
            envs: HashMap::from_iter(envs.map(|(k, v)| (k.to_string(), v.to_string()))),
        })
}
