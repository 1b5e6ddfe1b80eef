//! One-shot JSON subprocess bridge used by the command-backed planner and
//! writer.
//!
//! The program receives a single JSON request on stdin and must answer with a
//! single JSON message on stdout. Its stderr is passed through to ours.

use std::process::Stdio;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Reply from an external collaborator.
#[derive(Debug, serde::Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ResponseMessage<T> {
    Result(T),
    Error { error: String },
}

/// Run `argv`, send `request`, and decode the reply.
///
/// Errors are returned as plain messages; callers wrap them in the matching
/// collaborator error variant.
pub(crate) async fn run_json<Req, Resp>(
    argv: &[String],
    request: &Req,
) -> std::result::Result<Resp, String>
where
    Req: Serialize + ?Sized,
    Resp: DeserializeOwned,
{
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| "no command configured".to_string())?;

    let payload =
        serde_json::to_vec(request).map_err(|e| format!("failed to serialize request: {e}"))?;

    debug!(%program, bytes = payload.len(), "spawning collaborator");
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| format!("failed to spawn `{program}`: {e}"))?;

    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| "failed to capture stdin".to_string())?;
    stdin
        .write_all(&payload)
        .await
        .map_err(|e| format!("failed to write request: {e}"))?;
    stdin
        .write_all(b"\n")
        .await
        .map_err(|e| format!("failed to write request: {e}"))?;
    // Closing stdin signals end of request.
    drop(stdin);

    let output = child
        .wait_with_output()
        .await
        .map_err(|e| format!("failed to wait for `{program}`: {e}"))?;

    if !output.status.success() {
        return Err(format!("`{program}` exited with {}", output.status));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let message: ResponseMessage<Resp> = serde_json::from_str(stdout.trim()).map_err(|e| {
        let preview: String = stdout.chars().take(200).collect();
        format!("invalid response: {e} (got: {preview})")
    })?;

    match message {
        ResponseMessage::Result(resp) => Ok(resp),
        ResponseMessage::Error { error } => Err(error),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[derive(Debug, serde::Deserialize)]
    struct Echo {
        text: String,
    }

    fn sh(script: &str) -> Vec<String> {
        vec!["sh".into(), "-c".into(), script.into()]
    }

    #[tokio::test]
    async fn decodes_result() {
        let argv = sh(r#"cat > /dev/null; echo '{"type":"result","text":"hi"}'"#);
        let echo: Echo = run_json(&argv, &serde_json::json!({"x": 1})).await.unwrap();
        assert_eq!(echo.text, "hi");
    }

    #[tokio::test]
    async fn error_message_is_returned() {
        let argv = sh(r#"cat > /dev/null; echo '{"type":"error","error":"nope"}'"#);
        let err = run_json::<_, Echo>(&argv, &serde_json::json!({})).await.unwrap_err();
        assert_eq!(err, "nope");
    }

    #[tokio::test]
    async fn non_zero_exit_is_error() {
        let argv = sh("cat > /dev/null; exit 3");
        let err = run_json::<_, Echo>(&argv, &serde_json::json!({})).await.unwrap_err();
        assert!(err.contains("exited"));
    }

    #[tokio::test]
    async fn malformed_output_is_error() {
        let argv = sh("cat > /dev/null; echo not-json");
        let err = run_json::<_, Echo>(&argv, &serde_json::json!({})).await.unwrap_err();
        assert!(err.contains("invalid response"));
    }

    #[tokio::test]
    async fn empty_command_is_error() {
        let err = run_json::<_, Echo>(&[], &serde_json::json!({})).await.unwrap_err();
        assert!(err.contains("no command"));
    }
}
