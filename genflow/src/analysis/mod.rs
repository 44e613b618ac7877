//! Calls to the external content-analysis service.
//!
//! The service is a request/response API keyed by capability. Payloads are
//! opaque JSON at the trait boundary; the helpers in this module give each
//! capability typed requests and responses.

#[cfg(feature = "http")]
mod http;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

#[cfg(feature = "http")]
pub use http::HttpAnalysisClient;

use crate::errors::{AnalysisError, Result};
use crate::source::SourceFile;

/// A named analysis capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    /// Summarize one source file.
    SummarizeFile,
    /// Draft a blueprint from a file list.
    DraftBlueprint,
    /// Refine a draft blueprint with sample code.
    RefineBlueprint,
}

impl Capability {
    /// Returns the capability name used on the wire.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SummarizeFile => "summarize-file",
            Self::DraftBlueprint => "draft-blueprint",
            Self::RefineBlueprint => "refine-blueprint",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Client for the analysis service.
///
/// Implementations surface transport failures and non-2xx responses as
/// [`AnalysisError`]; the helpers below additionally reject payloads whose
/// `status` field is not a success value.
#[async_trait]
pub trait AnalysisClient: Send + Sync {
    /// Calls a capability with an opaque request payload.
    async fn call(
        &self,
        capability: Capability,
        request: serde_json::Value,
    ) -> Result<serde_json::Value>;
}

/// Request for `summarize-file`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummarizeFileRequest {
    /// Path of the file.
    pub filepath: String,
    /// File contents.
    pub code: String,
}

#[derive(Debug, Deserialize)]
struct SummarizeFileResponse {
    summary: String,
}

/// Response of `draft-blueprint`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DraftBlueprint {
    /// Draft blueprint narrative.
    pub draft: String,
    /// Files the service recommends excluding from analysis.
    #[serde(default)]
    pub excluded_files: Vec<String>,
    /// Files to analyze, most important first.
    #[serde(default)]
    pub prioritized_files: Vec<String>,
    /// A representative source file.
    #[serde(default)]
    pub sample_source_file: Option<String>,
    /// A deployment or project configuration file.
    #[serde(default)]
    pub deployment_file: Option<String>,
}

/// Request for `refine-blueprint`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefinementRequest {
    /// Draft blueprint narrative.
    pub draft: String,
    /// Path of the sample source file, if any.
    #[serde(default)]
    pub code_file: Option<String>,
    /// Contents of the sample source file, or a placeholder.
    pub code: String,
    /// Path of the deployment file, if any.
    #[serde(default)]
    pub project_file_name: Option<String>,
    /// Contents of the deployment file, or a placeholder.
    pub project_file: String,
}

#[derive(Debug, Deserialize)]
struct RefineBlueprintResponse {
    blueprint: String,
}

/// Rejects payloads carrying a non-success `status`.
pub fn check_status(capability: Capability, response: &serde_json::Value) -> Result<()> {
    let Some(status) = response.get("status") else {
        return Ok(());
    };
    let ok = match status {
        serde_json::Value::String(s) => {
            matches!(s.to_ascii_lowercase().as_str(), "success" | "ok" | "succeeded")
        }
        serde_json::Value::Number(n) => n.as_u64().is_some_and(|code| (200..300).contains(&code)),
        serde_json::Value::Bool(b) => *b,
        _ => false,
    };
    if ok {
        return Ok(());
    }

    let message = response
        .get("error")
        .or_else(|| response.get("message"))
        .and_then(serde_json::Value::as_str)
        .map_or_else(|| format!("status {status}"), ToString::to_string);
    let mut err = AnalysisError::new(capability.as_str(), message);
    if let Some(code) = status.as_u64().and_then(|c| u16::try_from(c).ok()) {
        err = err.with_status(code);
    }
    Err(err.into())
}

async fn call_typed<Req, Resp>(
    client: &dyn AnalysisClient,
    capability: Capability,
    request: &Req,
) -> Result<Resp>
where
    Req: Serialize + Sync,
    Resp: DeserializeOwned,
{
    let response = client
        .call(capability, serde_json::to_value(request)?)
        .await?;
    check_status(capability, &response)?;
    serde_json::from_value(response).map_err(|e| {
        AnalysisError::new(capability.as_str(), format!("malformed response: {e}")).into()
    })
}

/// Summarizes one file.
pub async fn summarize_file(client: &dyn AnalysisClient, file: &SourceFile) -> Result<String> {
    let request = SummarizeFileRequest {
        filepath: file.path.clone(),
        code: file.source.clone(),
    };
    let response: SummarizeFileResponse =
        call_typed(client, Capability::SummarizeFile, &request).await?;
    Ok(response.summary)
}

/// Drafts a blueprint from the project's file list.
pub async fn draft_blueprint(
    client: &dyn AnalysisClient,
    files: &[String],
) -> Result<DraftBlueprint> {
    call_typed(
        client,
        Capability::DraftBlueprint,
        &serde_json::json!({ "filelist": files }),
    )
    .await
}

/// Refines a draft blueprint into the final text.
pub async fn refine_blueprint(
    client: &dyn AnalysisClient,
    request: &RefinementRequest,
) -> Result<String> {
    let response: RefineBlueprintResponse =
        call_typed(client, Capability::RefineBlueprint, request).await?;
    Ok(response.blueprint)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::GeneratorError;
    use crate::testing::ScriptedAnalysisClient;

    #[test]
    fn test_capability_names() {
        assert_eq!(Capability::SummarizeFile.to_string(), "summarize-file");
        assert_eq!(
            serde_json::to_string(&Capability::RefineBlueprint).unwrap(),
            r#""refine-blueprint""#
        );
    }

    #[test]
    fn test_check_status() {
        let cap = Capability::DraftBlueprint;
        assert!(check_status(cap, &serde_json::json!({"draft": "x"})).is_ok());
        assert!(check_status(cap, &serde_json::json!({"status": "success"})).is_ok());
        assert!(check_status(cap, &serde_json::json!({"status": 200})).is_ok());

        let err = check_status(cap, &serde_json::json!({"status": "error", "error": "quota"}))
            .unwrap_err();
        match err {
            GeneratorError::Analysis(e) => {
                assert_eq!(e.capability, "draft-blueprint");
                assert_eq!(e.message, "quota");
            }
            other => panic!("unexpected error: {other}"),
        }

        let err = check_status(cap, &serde_json::json!({"status": 503})).unwrap_err();
        assert!(matches!(err, GeneratorError::Analysis(AnalysisError { status: Some(503), .. })));
    }

    #[tokio::test]
    async fn test_summarize_file_sends_path_and_code() {
        let client = ScriptedAnalysisClient::new();
        client.push_ok(
            Capability::SummarizeFile,
            serde_json::json!({"status": "success", "summary": "Entry point"}),
        );

        let summary = summarize_file(&client, &SourceFile::new("src/main.rs", "fn main() {}"))
            .await
            .unwrap();

        assert_eq!(summary, "Entry point");
        let calls = client.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1["filepath"], "src/main.rs");
        assert_eq!(calls[0].1["code"], "fn main() {}");
    }

    #[tokio::test]
    async fn test_draft_blueprint_parses_optional_fields() {
        let client = ScriptedAnalysisClient::new();
        client.push_ok(
            Capability::DraftBlueprint,
            serde_json::json!({
                "status": "success",
                "draft": "A CLI tool",
                "prioritized_files": ["src/main.rs"],
                "sample_source_file": "src/main.rs"
            }),
        );

        let draft = draft_blueprint(&client, &["src/main.rs".to_string()])
            .await
            .unwrap();

        assert_eq!(draft.draft, "A CLI tool");
        assert_eq!(draft.sample_source_file.as_deref(), Some("src/main.rs"));
        assert!(draft.deployment_file.is_none());
        assert!(draft.excluded_files.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_response_is_analysis_error() {
        let client = ScriptedAnalysisClient::new();
        client.push_ok(Capability::RefineBlueprint, serde_json::json!({"text": "?"}));

        let request = RefinementRequest {
            draft: "d".into(),
            code_file: None,
            code: "No Code Provided".into(),
            project_file_name: None,
            project_file: "No Project File Provided".into(),
        };
        let err = refine_blueprint(&client, &request).await.unwrap_err();
        assert!(matches!(err, GeneratorError::Analysis(_)));
    }
}
