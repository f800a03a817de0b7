use async_trait::async_trait;
use chrono::{DateTime, Utc};
use facesync_contract::{
    DetectedFace, IdentifyResult, OperationReport, OperationStatus, PersonGroupSummary,
    SimilarFace, SnapshotSummary, TrainingReport,
};
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::api::FaceOps;
use crate::endpoint::RemoteEndpoint;
use crate::error::FaceClientError;

const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";
const OPERATION_LOCATION_HEADER: &str = "Operation-Location";
const API_ROOT: &str = "face/v1.0";

/// reqwest-backed [`FaceOps`] implementation bound to one [`RemoteEndpoint`].
/// Marshals the vendor's JSON shapes; no other crate depends on them.
#[derive(Debug, Clone)]
pub struct HttpFaceClient {
    http: reqwest::Client,
    endpoint: RemoteEndpoint,
}

impl HttpFaceClient {
    pub fn new(endpoint: RemoteEndpoint) -> Result<Self, FaceClientError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("facesync/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, endpoint })
    }

    pub fn endpoint(&self) -> &RemoteEndpoint {
        &self.endpoint
    }

    async fn dispatch(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&Value>,
    ) -> Result<Response, FaceClientError> {
        let url = self.endpoint.join(path)?;
        debug!(%method, path, "face api request");

        let mut request = self
            .http
            .request(method, url)
            .header(SUBSCRIPTION_KEY_HEADER, self.endpoint.key());
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        self.check(response, path).await
    }

    async fn check(
        &self,
        response: Response,
        resource: &str,
    ) -> Result<Response, FaceClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::NOT_FOUND {
            return Err(FaceClientError::NotFound {
                resource: resource.to_string(),
            });
        }

        let body = response.text().await?;
        match serde_json::from_str::<ServiceErrorBody>(&body) {
            Ok(parsed) => Err(FaceClientError::Service {
                status: status.as_u16(),
                code: parsed.error.code,
                message: parsed.error.message,
            }),
            Err(_) => Err(FaceClientError::Service {
                status: status.as_u16(),
                code: "unknown".to_string(),
                message: body,
            }),
        }
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&Value>,
    ) -> Result<T, FaceClientError> {
        let response = self.dispatch(method, path, query, body).await?;
        response.json::<T>().await.map_err(FaceClientError::from)
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<(), FaceClientError> {
        self.dispatch(method, path, &[], body).await.map(|_| ())
    }

    /// Long-running submits answer 202 with an `Operation-Location` header
    /// naming the operation to poll; the body is empty.
    async fn submit(&self, path: &str, body: &Value) -> Result<String, FaceClientError> {
        let response = self.dispatch(Method::POST, path, &[], Some(body)).await?;
        let header = response
            .headers()
            .get(OPERATION_LOCATION_HEADER)
            .ok_or(FaceClientError::MissingOperationLocation)?;
        let location = header.to_str().map_err(|_| {
            FaceClientError::malformed("Operation-Location header is not valid text")
        })?;
        operation_id_from_location(location).ok_or_else(|| {
            FaceClientError::malformed(format!(
                "Operation-Location {location:?} does not name an operation"
            ))
        })
    }
}

#[async_trait]
impl FaceOps for HttpFaceClient {
    async fn list_person_groups(&self) -> Result<Vec<PersonGroupSummary>, FaceClientError> {
        self.fetch(Method::GET, &format!("{API_ROOT}/persongroups"), &[], None)
            .await
    }

    async fn create_person_group(
        &self,
        group_id: &str,
        name: &str,
    ) -> Result<(), FaceClientError> {
        let path = format!("{API_ROOT}/persongroups/{group_id}");
        self.execute(Method::PUT, &path, Some(&json!({ "name": name })))
            .await
    }

    async fn delete_person_group(&self, group_id: &str) -> Result<(), FaceClientError> {
        let path = format!("{API_ROOT}/persongroups/{group_id}");
        self.execute(Method::DELETE, &path, None).await
    }

    async fn create_person(
        &self,
        group_id: &str,
        name: &str,
    ) -> Result<String, FaceClientError> {
        let path = format!("{API_ROOT}/persongroups/{group_id}/persons");
        let created: CreatedPerson = self
            .fetch(Method::POST, &path, &[], Some(&json!({ "name": name })))
            .await?;
        Ok(created.person_id)
    }

    async fn add_person_face(
        &self,
        group_id: &str,
        person_id: &str,
        image_url: &str,
    ) -> Result<String, FaceClientError> {
        let path = format!("{API_ROOT}/persongroups/{group_id}/persons/{person_id}/persistedfaces");
        let added: AddedFace = self
            .fetch(Method::POST, &path, &[], Some(&json!({ "url": image_url })))
            .await?;
        Ok(added.persisted_face_id)
    }

    async fn train_person_group(&self, group_id: &str) -> Result<(), FaceClientError> {
        let path = format!("{API_ROOT}/persongroups/{group_id}/train");
        self.execute(Method::POST, &path, None).await
    }

    async fn training_status(&self, group_id: &str) -> Result<TrainingReport, FaceClientError> {
        let path = format!("{API_ROOT}/persongroups/{group_id}/training");
        self.fetch(Method::GET, &path, &[], None).await
    }

    async fn take_snapshot(
        &self,
        group_id: &str,
        apply_scope: &[String],
    ) -> Result<String, FaceClientError> {
        self.submit(
            &format!("{API_ROOT}/snapshots"),
            &json!({
                "type": "PersonGroup",
                "objectId": group_id,
                "applyScope": apply_scope,
            }),
        )
        .await
    }

    async fn apply_snapshot(
        &self,
        snapshot_id: &str,
        new_group_id: &str,
    ) -> Result<String, FaceClientError> {
        self.submit(
            &format!("{API_ROOT}/snapshots/{snapshot_id}/apply"),
            &json!({ "objectId": new_group_id, "mode": "CreateNew" }),
        )
        .await
    }

    async fn operation_status(
        &self,
        operation_id: &str,
    ) -> Result<OperationReport, FaceClientError> {
        let path = format!("{API_ROOT}/operations/{operation_id}");
        let body: OperationStatusBody = self.fetch(Method::GET, &path, &[], None).await?;
        Ok(body.into_report(operation_id))
    }

    async fn list_snapshots(&self) -> Result<Vec<SnapshotSummary>, FaceClientError> {
        self.fetch(Method::GET, &format!("{API_ROOT}/snapshots"), &[], None)
            .await
    }

    async fn delete_snapshot(&self, snapshot_id: &str) -> Result<(), FaceClientError> {
        let path = format!("{API_ROOT}/snapshots/{snapshot_id}");
        self.execute(Method::DELETE, &path, None).await
    }

    async fn detect_faces(&self, image_url: &str) -> Result<Vec<DetectedFace>, FaceClientError> {
        self.fetch(
            Method::POST,
            &format!("{API_ROOT}/detect"),
            &[("returnFaceId", "true")],
            Some(&json!({ "url": image_url })),
        )
        .await
    }

    async fn find_similar(
        &self,
        face_id: &str,
        candidates: &[String],
    ) -> Result<Vec<SimilarFace>, FaceClientError> {
        self.fetch(
            Method::POST,
            &format!("{API_ROOT}/findsimilars"),
            &[],
            Some(&json!({ "faceId": face_id, "faceIds": candidates })),
        )
        .await
    }

    async fn identify(
        &self,
        face_ids: &[String],
        group_id: &str,
    ) -> Result<Vec<IdentifyResult>, FaceClientError> {
        self.fetch(
            Method::POST,
            &format!("{API_ROOT}/identify"),
            &[],
            Some(&json!({ "faceIds": face_ids, "personGroupId": group_id })),
        )
        .await
    }
}

/// Wire shape of the operation-status endpoint. The snapshot operations API
/// is known to answer with PascalCase keys where the rest of the surface uses
/// camelCase, so both spellings are accepted.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OperationStatusBody {
    #[serde(alias = "Status")]
    status: OperationStatus,
    #[serde(default, alias = "CreatedTime")]
    created_time: Option<DateTime<Utc>>,
    #[serde(default, alias = "LastActionTime")]
    last_action_time: Option<DateTime<Utc>>,
    #[serde(default, alias = "ResourceLocation")]
    resource_location: Option<String>,
    #[serde(default, alias = "Message")]
    message: Option<String>,
}

impl OperationStatusBody {
    fn into_report(self, operation_id: &str) -> OperationReport {
        OperationReport {
            operation_id: operation_id.to_string(),
            status: self.status,
            resource_location: self.resource_location,
            message: self.message,
            created_time: self.created_time,
            last_action_time: self.last_action_time,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedPerson {
    person_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddedFace {
    persisted_face_id: String,
}

#[derive(Debug, Deserialize)]
struct ServiceErrorBody {
    error: ServiceErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ServiceErrorDetail {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

fn operation_id_from_location(location: &str) -> Option<String> {
    let id = location.rsplit('/').next()?.trim();
    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}
