// # Cato Networks Container Service
//
// This crate provides a Cato Networks implementation of the container
// service for the listsync system, speaking the Cato GraphQL API.
//
// ## Implementation Notes
//
// - One HTTP request per trait method invocation
// - Full error propagation to the engine (no retry, no backoff here)
// - HTTP timeouts configured (10 seconds; 30 for file uploads)
// - GraphQL `errors` in a 200 response surface as `RemoteRejected` with
//   the structured payload preserved
// - Container creation uses the API's multipart create-from-file shape
//   (operations / map / CSV file parts)
// - NO caching (owned by the engine's ValueCache)
// - NO spawned tasks
//
// ## Security Requirements
//
// - The API key NEVER appears in logs or Debug output
// - The provider fails fast on an empty key or account id
//
// ## API Reference
//
// - GraphQL endpoint: https://api.catonetworks.com/api/v1/graphql2
// - Authentication: `X-api-key` request header

use async_trait::async_trait;
use listsync_core::traits::{
    ContainerInfo, ContainerKind, ContainerService, IpRange, MutationReceipt,
};
use listsync_core::{Error, Result};
use serde_json::{Value, json};
use std::time::Duration;

/// Default Cato GraphQL API endpoint
const DEFAULT_API_URL: &str = "https://api.catonetworks.com/api/v1/graphql2";

/// Default HTTP timeout for API requests
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP timeout for multipart file uploads (container creation)
const UPLOAD_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

mod queries {
    //! GraphQL documents for the container API

    pub const CREATE_IP_CONTAINER: &str = r#"
mutation createIpAddressRangeContainerFromFile($accountId:ID!, $input:CreateIpAddressRangeContainerFromFileInput!) {
    container(accountId: $accountId) {
        ipAddressRange {
            createFromFile(input: $input) {
                container { __typename id name description size }
            }
        }
    }
}
"#;

    pub const CREATE_FQDN_CONTAINER: &str = r#"
mutation createFqdnContainerFromFile($accountId:ID!, $input:CreateFqdnContainerFromFileInput!) {
    container(accountId: $accountId) {
        fqdn {
            createFromFile(input: $input) {
                container { __typename id name description size }
            }
        }
    }
}
"#;

    pub const ADD_IP_RANGES: &str = r#"
mutation addIpRangeToContainer($accountId:ID!, $input:IpAddressRangeContainerAddValuesInput!) {
    container(accountId: $accountId) {
        ipAddressRange {
            addValues(input: $input) {
                container { __typename id name description size }
            }
        }
    }
}
"#;

    pub const REMOVE_IP_RANGES: &str = r#"
mutation removeIpRangeFromContainer($accountId:ID!, $input:IpAddressRangeContainerRemoveValuesInput!) {
    container(accountId: $accountId) {
        ipAddressRange {
            removeValues(input: $input) {
                container { __typename id name description size }
            }
        }
    }
}
"#;

    pub const ADD_FQDNS: &str = r#"
mutation addFqdnsToContainer($accountId:ID!, $input:FqdnContainerAddValuesInput!) {
    container(accountId: $accountId) {
        fqdn {
            addValues(input: $input) {
                container { __typename id name description size }
            }
        }
    }
}
"#;

    pub const REMOVE_FQDNS: &str = r#"
mutation removeFqdnsFromContainer($accountId:ID!, $input:FqdnContainerRemoveValuesInput!) {
    container(accountId: $accountId) {
        fqdn {
            removeValues(input: $input) {
                container { __typename id name description size }
            }
        }
    }
}
"#;

    pub const LIST_CONTAINERS: &str = r#"
query listContainers($accountId:ID!, $input:ContainerSearchInput!) {
    container(accountId: $accountId) {
        list(input: $input) {
            containers { __typename id name description size }
        }
    }
}
"#;

    pub const DELETE_CONTAINER: &str = r#"
mutation deleteContainer($accountId:ID!, $input:DeleteContainerInput!) {
    container(accountId: $accountId) {
        delete(input: $input) {
            container { __typename id name description size }
        }
    }
}
"#;
}

/// Cato Networks container service client
///
/// Stateless and single-shot: every method performs exactly one API call
/// and returns the decoded outcome. All coordination (cache gating,
/// reconciliation) is owned by the engine.
///
/// # Security
///
/// The Debug implementation intentionally does NOT expose the API key.
pub struct CatoClient {
    /// Cato API key
    /// ⚠️ NEVER log this value
    api_key: String,

    /// Account ID the container operations are scoped to
    account_id: String,

    /// GraphQL endpoint URL
    url: String,

    /// HTTP client for API requests
    client: reqwest::Client,
}

impl std::fmt::Debug for CatoClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatoClient")
            .field("api_key", &"<REDACTED>")
            .field("account_id", &self.account_id)
            .field("url", &self.url)
            .finish()
    }
}

impl CatoClient {
    /// Create a new client for the default API endpoint
    pub fn new(api_key: impl Into<String>, account_id: impl Into<String>) -> Result<Self> {
        Self::with_url(api_key, account_id, DEFAULT_API_URL)
    }

    /// Create a new client for an explicit API endpoint
    pub fn with_url(
        api_key: impl Into<String>,
        account_id: impl Into<String>,
        url: impl Into<String>,
    ) -> Result<Self> {
        let api_key = api_key.into();
        let account_id = account_id.into();

        if api_key.is_empty() {
            return Err(Error::config(
                "API key is required; provide it or set CATO_API_KEY",
            ));
        }
        if account_id.is_empty() {
            return Err(Error::config(
                "account ID is required; provide it or set CATO_ACCOUNT_ID",
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(UPLOAD_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            api_key,
            account_id,
            url: url.into(),
            client,
        })
    }

    /// Create a client from `CATO_API_KEY`, `CATO_ACCOUNT_ID` and the
    /// optional `CATO_API_URL` environment variables
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("CATO_API_KEY").unwrap_or_default();
        let account_id = std::env::var("CATO_ACCOUNT_ID").unwrap_or_default();
        let url = std::env::var("CATO_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        Self::with_url(api_key, account_id, url)
    }

    /// Send a GraphQL request and return the decoded response body
    ///
    /// Transport problems and non-success HTTP statuses surface as
    /// `RemoteUnavailable`; an `errors` array in the body surfaces as
    /// `RemoteRejected` with the payload preserved.
    async fn send(&self, operation: &str, query: &str, variables: Value) -> Result<Value> {
        let body = json!({
            "operationName": operation,
            "query": query,
            "variables": variables,
        });

        tracing::debug!(operation, url = %self.url, "sending API request");

        let response = self
            .client
            .post(&self.url)
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .header("X-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::remote_unavailable(format!("request failed: {e}")))?;

        Self::decode_response(operation, response).await
    }

    /// Send a multipart create-from-file request
    ///
    /// The API expects the standard GraphQL multipart shape: an
    /// `operations` part with the document and null-file variables, a
    /// `map` part binding file parts to variable paths, then the CSV file.
    async fn send_multipart(
        &self,
        operation: &str,
        query: &str,
        variables: Value,
        file_name: String,
        csv_content: String,
    ) -> Result<Value> {
        let operations = json!({
            "operationName": operation,
            "query": query,
            "variables": variables,
        });
        let map = json!({ "0": ["variables.input.uploadFile"] });

        let file_part = reqwest::multipart::Part::text(csv_content)
            .file_name(file_name)
            .mime_str("text/csv")
            .map_err(|e| Error::config(format!("invalid upload mime type: {e}")))?;

        let form = reqwest::multipart::Form::new()
            .text("operations", operations.to_string())
            .text("map", map.to_string())
            .part("0", file_part);

        tracing::debug!(operation, url = %self.url, "sending multipart API request");

        let response = self
            .client
            .post(&self.url)
            .timeout(UPLOAD_HTTP_TIMEOUT)
            .header("X-api-key", &self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::remote_unavailable(format!("upload request failed: {e}")))?;

        Self::decode_response(operation, response).await
    }

    async fn decode_response(operation: &str, response: reqwest::Response) -> Result<Value> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error response".to_string());
            return Err(Error::remote_unavailable(format!(
                "HTTP {status} from API for {operation}: {body}"
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| Error::remote_unavailable(format!("malformed API response: {e}")))?;

        reject_graphql_errors(operation, body)
    }

    fn account_ref(&self, container: &str, values: Value) -> Value {
        json!({
            "accountId": self.account_id,
            "input": {
                "ref": { "by": "NAME", "input": container },
                "values": values,
            }
        })
    }
}

/// Fail with `RemoteRejected` when the response body carries GraphQL errors
fn reject_graphql_errors(operation: &str, body: Value) -> Result<Value> {
    match body.get("errors") {
        Some(errors) if !errors.is_null() => {
            let summary = summarize_errors(errors);
            tracing::debug!(operation, %summary, "API reported errors");
            Err(Error::remote_rejected(summary, errors.clone()))
        }
        _ => Ok(body),
    }
}

/// First error message from a GraphQL errors array, for the error summary
fn summarize_errors(errors: &Value) -> String {
    errors
        .as_array()
        .and_then(|list| list.first())
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str)
        .unwrap_or("unspecified API error")
        .to_string()
}

/// Map a GraphQL `__typename` to a container kind
fn kind_from_typename(typename: &str) -> ContainerKind {
    match typename {
        "IpAddressRangeContainer" => ContainerKind::Ip,
        "FqdnContainer" => ContainerKind::Fqdn,
        other => ContainerKind::Other(other.to_string()),
    }
}

/// Walk a JSON path, returning None on any missing step
fn dig<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |v, key| v.get(key))
}

/// Decode a container object from a response payload
fn container_from_value(value: &Value) -> Result<ContainerInfo> {
    let name = value
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::remote_unavailable("API response missing container name"))?;
    let kind = value
        .get("__typename")
        .and_then(Value::as_str)
        .map(kind_from_typename)
        .unwrap_or(ContainerKind::Other("unknown".to_string()));
    let size = value.get("size").and_then(Value::as_u64).unwrap_or(0);
    let description = value
        .get("description")
        .and_then(Value::as_str)
        .map(str::to_string);

    Ok(ContainerInfo {
        name: name.to_string(),
        kind,
        size,
        description,
    })
}

/// Decode a mutation receipt from the container object at `path`
///
/// The size is optional in mutation responses; its absence is not an
/// error, it just means the registry will not be refreshed.
fn receipt_from_response(body: &Value, path: &[&str], container: &str) -> MutationReceipt {
    let reported_size = dig(body, path).and_then(|c| c.get("size")).and_then(Value::as_u64);
    MutationReceipt {
        container: container.to_string(),
        reported_size,
    }
}

/// CSV line for one IP range: a bare address for single-address ranges,
/// `from-to` otherwise
fn ip_range_csv_line(range: &IpRange) -> String {
    if range.from == range.to {
        range.from.to_string()
    } else {
        format!("{}-{}", range.from, range.to)
    }
}

fn ip_values(ranges: &[IpRange]) -> Value {
    Value::Array(
        ranges
            .iter()
            .map(|r| json!({ "from": r.from.to_string(), "to": r.to.to_string() }))
            .collect(),
    )
}

#[async_trait]
impl ContainerService for CatoClient {
    async fn create_ip_container(
        &self,
        name: &str,
        description: &str,
        initial: &[IpRange],
    ) -> Result<ContainerInfo> {
        let variables = json!({
            "accountId": self.account_id,
            "input": {
                "name": name,
                "description": description,
                "fileType": "CSV",
                "uploadFile": null,
            }
        });
        let csv = initial
            .iter()
            .map(ip_range_csv_line)
            .collect::<Vec<_>>()
            .join("\n");

        let body = self
            .send_multipart(
                "createIpAddressRangeContainerFromFile",
                queries::CREATE_IP_CONTAINER,
                variables,
                format!("{name}.csv"),
                csv,
            )
            .await?;

        let container = dig(
            &body,
            &["data", "container", "ipAddressRange", "createFromFile", "container"],
        )
        .ok_or_else(|| Error::remote_unavailable("API response missing created container"))?;
        container_from_value(container)
    }

    async fn create_fqdn_container(
        &self,
        name: &str,
        description: &str,
        initial: &[String],
    ) -> Result<ContainerInfo> {
        let variables = json!({
            "accountId": self.account_id,
            "input": {
                "name": name,
                "description": description,
                "fileType": "CSV",
                "uploadFile": null,
            }
        });
        let csv = initial.join("\n");

        let body = self
            .send_multipart(
                "createFqdnContainerFromFile",
                queries::CREATE_FQDN_CONTAINER,
                variables,
                format!("{name}.csv"),
                csv,
            )
            .await?;

        let container = dig(
            &body,
            &["data", "container", "fqdn", "createFromFile", "container"],
        )
        .ok_or_else(|| Error::remote_unavailable("API response missing created container"))?;
        container_from_value(container)
    }

    async fn add_ip_ranges(&self, container: &str, ranges: &[IpRange]) -> Result<MutationReceipt> {
        let body = self
            .send(
                "addIpRangeToContainer",
                queries::ADD_IP_RANGES,
                self.account_ref(container, ip_values(ranges)),
            )
            .await?;

        Ok(receipt_from_response(
            &body,
            &["data", "container", "ipAddressRange", "addValues", "container"],
            container,
        ))
    }

    async fn remove_ip_ranges(
        &self,
        container: &str,
        ranges: &[IpRange],
    ) -> Result<MutationReceipt> {
        let body = self
            .send(
                "removeIpRangeFromContainer",
                queries::REMOVE_IP_RANGES,
                self.account_ref(container, ip_values(ranges)),
            )
            .await?;

        Ok(receipt_from_response(
            &body,
            &["data", "container", "ipAddressRange", "removeValues", "container"],
            container,
        ))
    }

    async fn add_fqdns(&self, container: &str, fqdns: &[String]) -> Result<MutationReceipt> {
        let body = self
            .send(
                "addFqdnsToContainer",
                queries::ADD_FQDNS,
                self.account_ref(container, json!(fqdns)),
            )
            .await?;

        Ok(receipt_from_response(
            &body,
            &["data", "container", "fqdn", "addValues", "container"],
            container,
        ))
    }

    async fn remove_fqdns(&self, container: &str, fqdns: &[String]) -> Result<MutationReceipt> {
        let body = self
            .send(
                "removeFqdnsFromContainer",
                queries::REMOVE_FQDNS,
                self.account_ref(container, json!(fqdns)),
            )
            .await?;

        Ok(receipt_from_response(
            &body,
            &["data", "container", "fqdn", "removeValues", "container"],
            container,
        ))
    }

    async fn list_containers(&self) -> Result<Vec<ContainerInfo>> {
        let variables = json!({
            "accountId": self.account_id,
            "input": {},
        });
        let body = self
            .send("listContainers", queries::LIST_CONTAINERS, variables)
            .await?;

        let containers = dig(&body, &["data", "container", "list", "containers"])
            .and_then(Value::as_array)
            .ok_or_else(|| Error::remote_unavailable("API response missing container list"))?;

        containers.iter().map(container_from_value).collect()
    }

    async fn delete_container(&self, name: &str) -> Result<()> {
        let variables = json!({
            "accountId": self.account_id,
            "input": {
                "ref": { "by": "NAME", "input": name },
            }
        });
        self.send("deleteContainer", queries::DELETE_CONTAINER, variables)
            .await?;
        Ok(())
    }

    fn service_name(&self) -> &'static str {
        "cato"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_credentials_are_config_errors() {
        assert!(matches!(CatoClient::new("", "123"), Err(Error::Config(_))));
        assert!(matches!(
            CatoClient::new("key", ""),
            Err(Error::Config(_))
        ));
        assert!(CatoClient::new("key", "123").is_ok());
    }

    #[test]
    fn debug_output_redacts_the_api_key() {
        let client = CatoClient::new("super-secret-key", "123").unwrap();
        let debug = format!("{client:?}");
        assert!(!debug.contains("super-secret-key"));
        assert!(debug.contains("<REDACTED>"));
    }

    #[test]
    fn typename_maps_to_kind() {
        assert_eq!(kind_from_typename("IpAddressRangeContainer"), ContainerKind::Ip);
        assert_eq!(kind_from_typename("FqdnContainer"), ContainerKind::Fqdn);
        assert_eq!(
            kind_from_typename("SomethingElse"),
            ContainerKind::Other("SomethingElse".to_string())
        );
    }

    #[test]
    fn graphql_errors_become_remote_rejected() {
        let body = json!({
            "errors": [{ "message": "permission denied" }],
            "data": null,
        });
        let err = reject_graphql_errors("addFqdnsToContainer", body).unwrap_err();
        match err {
            Error::RemoteRejected { summary, errors } => {
                assert_eq!(summary, "permission denied");
                assert_eq!(errors[0]["message"], "permission denied");
            }
            other => panic!("expected RemoteRejected, got {other:?}"),
        }
    }

    #[test]
    fn clean_body_passes_through() {
        let body = json!({ "data": { "container": {} } });
        assert!(reject_graphql_errors("listContainers", body).is_ok());
    }

    #[test]
    fn receipt_decoding_reads_nested_size() {
        let body = json!({
            "data": { "container": { "fqdn": { "addValues": { "container": {
                "__typename": "FqdnContainer",
                "name": "block",
                "size": 17,
            }}}}}
        });
        let receipt = receipt_from_response(
            &body,
            &["data", "container", "fqdn", "addValues", "container"],
            "block",
        );
        assert_eq!(receipt.reported_size, Some(17));
        assert_eq!(receipt.container, "block");
    }

    #[test]
    fn receipt_decoding_tolerates_missing_size() {
        let body = json!({
            "data": { "container": { "fqdn": { "addValues": { "container": {
                "name": "block",
            }}}}}
        });
        let receipt = receipt_from_response(
            &body,
            &["data", "container", "fqdn", "addValues", "container"],
            "block",
        );
        assert_eq!(receipt.reported_size, None);
    }

    #[test]
    fn container_decoding_reads_all_fields() {
        let value = json!({
            "__typename": "IpAddressRangeContainer",
            "name": "edge",
            "description": "edge ranges",
            "size": 4,
        });
        let info = container_from_value(&value).unwrap();
        assert_eq!(info.name, "edge");
        assert_eq!(info.kind, ContainerKind::Ip);
        assert_eq!(info.size, 4);
        assert_eq!(info.description.as_deref(), Some("edge ranges"));
    }

    #[test]
    fn csv_lines_collapse_single_address_ranges() {
        let single = IpRange::single("10.0.0.1".parse().unwrap());
        assert_eq!(ip_range_csv_line(&single), "10.0.0.1");

        let span = IpRange::new("10.0.0.1".parse().unwrap(), "10.0.0.9".parse().unwrap());
        assert_eq!(ip_range_csv_line(&span), "10.0.0.1-10.0.0.9");
    }

    #[test]
    fn ip_values_use_from_to_objects() {
        let ranges = vec![IpRange::new(
            "10.0.0.1".parse().unwrap(),
            "10.0.0.9".parse().unwrap(),
        )];
        let values = ip_values(&ranges);
        assert_eq!(values[0]["from"], "10.0.0.1");
        assert_eq!(values[0]["to"], "10.0.0.9");
    }
}
