/// Fatal outcomes of a studio run. Anything not listed here is degraded:
/// it is logged as a warning and the pipeline keeps going.
#[derive(Debug, thiserror::Error)]
pub enum StudioError {
    #[error("FFmpeg not found (tried `{0}`). Install FFmpeg and make sure it is on PATH")]
    EncoderMissing(String),

    #[error("Missing credential: {0}")]
    MissingCredential(&'static str),

    #[error("Invalid run configuration: {0}")]
    InvalidRun(String),

    #[error("Script request failed: {0:#}")]
    ScriptRequest(anyhow::Error),

    #[error("Script response malformed: {0}")]
    MalformedScript(String),

    #[error("No scene produced a usable clip")]
    NoClips,

    #[error("Final assembly failed: {0}")]
    AssemblyFailed(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type StudioResult<T> = std::result::Result<T, StudioError>;
