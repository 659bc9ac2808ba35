//! HTTP gateway for the directory service's internal API

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;

use super::{DirectoryGateway, GatewayError, GatewayResult};
use crate::config::ServiceConfig;
use crate::entities::{Department, PersonnelNumber, Position, PositionAttributes};
use crate::id::{DepartmentId, PersonnelId, PositionId};

/// Responses wrap their payload in `{"data": ...}`
#[derive(Deserialize)]
struct Envelope<T> {
    #[serde(default = "Option::default")]
    data: Option<T>,
}

/// Directory gateway talking to the internal API with basic auth
#[derive(Clone)]
pub struct HttpDirectoryGateway {
    base_url: String,
    login: String,
    password: String,
    client: reqwest::Client,
}

impl fmt::Debug for HttpDirectoryGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpDirectoryGateway")
            .field("base_url", &self.base_url)
            .field("login", &self.login)
            .finish_non_exhaustive()
    }
}

impl HttpDirectoryGateway {
    /// Create a new gateway from the service configuration
    pub fn new(config: &ServiceConfig) -> GatewayResult<Self> {
        let base_url = config.url.trim_end_matches('/').to_string();

        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs_f64(config.connect_timeout_secs))
            .timeout(Duration::from_secs_f64(config.timeout_secs))
            .redirect(reqwest::redirect::Policy::none())
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(|cause| GatewayError::Transport {
                endpoint: base_url.clone(),
                cause,
            })?;

        Ok(Self {
            base_url,
            login: config.internal_api_login.clone(),
            password: config.internal_api_password.clone(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> GatewayResult<Option<T>> {
        let request = self.client.get(self.url(path)).query(query);
        self.send(request, path).await
    }

    /// Id lookups go through POST so long id lists are not cut by query
    /// string limits
    async fn post_ids<T: DeserializeOwned, I: serde::Serialize>(
        &self,
        path: &str,
        ids: &[I],
    ) -> GatewayResult<Option<T>> {
        self.post(path, &json!({ "ids": ids })).await
    }

    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> GatewayResult<Option<T>> {
        let request = self.client.post(self.url(path)).json(body);
        self.send(request, path).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        path: &str,
    ) -> GatewayResult<Option<T>> {
        tracing::debug!(endpoint = path, "directory request");

        let response = request
            .basic_auth(&self.login, Some(&self.password))
            .send()
            .await
            .map_err(|cause| GatewayError::Transport {
                endpoint: path.to_string(),
                cause,
            })?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::UNAUTHORIZED => {
                return Err(GatewayError::Unauthorized {
                    endpoint: path.to_string(),
                });
            }
            status => {
                return Err(GatewayError::Status {
                    endpoint: path.to_string(),
                    status: status.as_u16(),
                });
            }
        }

        let body = response
            .bytes()
            .await
            .map_err(|cause| GatewayError::Transport {
                endpoint: path.to_string(),
                cause,
            })?;

        let envelope: Envelope<T> =
            serde_json::from_slice(&body).map_err(|cause| GatewayError::Decode {
                endpoint: path.to_string(),
                cause,
            })?;

        Ok(envelope.data)
    }
}

#[async_trait]
impl DirectoryGateway for HttpDirectoryGateway {
    async fn direct_subordinates(
        &self,
        position_id: &PositionId,
        include_inactive_positions: bool,
    ) -> GatewayResult<Vec<Position>> {
        let path = format!("/internal/positions/{}/direct-subordinates", position_id);
        let include_inactive = if include_inactive_positions { "1" } else { "0" };
        Ok(self
            .get(&path, &[("include_inactive_positions", include_inactive)])
            .await?
            .unwrap_or_default())
    }

    async fn position(&self, position_id: &PositionId) -> GatewayResult<Position> {
        let path = format!("/internal/positions/{}", position_id);
        match self.get(&path, &[]).await {
            Ok(Some(position)) => Ok(position),
            Ok(None) | Err(GatewayError::Status { status: 404, .. }) => {
                Err(GatewayError::NotFound {
                    kind: "position",
                    id: position_id.to_string(),
                })
            }
            Err(e) => Err(e),
        }
    }

    async fn positions_by_ids(&self, ids: &[PositionId]) -> GatewayResult<Vec<Position>> {
        Ok(self
            .post_ids("/internal/positions", ids)
            .await?
            .unwrap_or_default())
    }

    async fn personnel_by_ids(&self, ids: &[PersonnelId]) -> GatewayResult<Vec<PersonnelNumber>> {
        Ok(self
            .post_ids("/internal/personnel-numbers", ids)
            .await?
            .unwrap_or_default())
    }

    async fn departments_by_ids(&self, ids: &[DepartmentId]) -> GatewayResult<Vec<Department>> {
        Ok(self
            .post_ids("/internal/departments", ids)
            .await?
            .unwrap_or_default())
    }

    async fn department(&self, department_id: &DepartmentId) -> GatewayResult<Department> {
        let path = format!("/internal/departments/{}", department_id);
        match self.get(&path, &[]).await {
            Ok(Some(department)) => Ok(department),
            Ok(None) | Err(GatewayError::Status { status: 404, .. }) => {
                Err(GatewayError::NotFound {
                    kind: "department",
                    id: department_id.to_string(),
                })
            }
            Err(e) => Err(e),
        }
    }

    async fn department_children(
        &self,
        department_id: &DepartmentId,
    ) -> GatewayResult<Vec<Department>> {
        Ok(self
            .get("/internal/departments", &[("parent_id", department_id.as_str())])
            .await?
            .unwrap_or_default())
    }

    async fn top_departments(&self, flatten: bool) -> GatewayResult<Vec<Department>> {
        let query: &[(&str, &str)] = if flatten { &[("flatten", "true")] } else { &[] };
        Ok(self
            .get("/internal/top-departments", query)
            .await?
            .unwrap_or_default())
    }

    async fn positions_in_departments(
        &self,
        department_ids: &[DepartmentId],
    ) -> GatewayResult<Vec<Position>> {
        Ok(self
            .post(
                "/internal/positions/search",
                &json!({ "department_ids": department_ids }),
            )
            .await?
            .unwrap_or_default())
    }

    async fn departments_with_company(
        &self,
        ids: &[DepartmentId],
    ) -> GatewayResult<Vec<Department>> {
        Ok(self
            .post(
                "/internal/departments",
                &json!({ "ids": ids, "with_company": true }),
            )
            .await?
            .unwrap_or_default())
    }

    async fn position_attributes(
        &self,
        ids: &[PositionId],
    ) -> GatewayResult<Vec<PositionAttributes>> {
        Ok(self
            .post_ids("/internal/position-attrs", ids)
            .await?
            .unwrap_or_default())
    }
}
