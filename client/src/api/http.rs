use anyhow::anyhow;
use async_trait::async_trait;
use comms::http::{
    CreateRoomRequest, CreateRoomResponse, ErrorResponse, PostMessageRequest, PostMessageResponse,
};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::error::ActionError;

use super::RoomsApi;

/// [HttpRoomsApi] talks JSON to the rooms routes mounted under `base_url`
#[derive(Debug, Clone)]
pub struct HttpRoomsApi {
    client: Client,
    base_url: Url,
}

impl HttpRoomsApi {
    pub fn new(base_url: Url) -> Self {
        HttpRoomsApi {
            client: Client::new(),
            base_url,
        }
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ActionError> {
        let mut url = self.base_url.clone();

        url.path_segments_mut()
            .map_err(|_| ActionError::Network(anyhow!("{} can not be a base url", self.base_url)))?
            .pop_if_empty()
            .extend(segments);

        Ok(url)
    }
}

/// Decodes a success body, or turns the `{ "error" }` body of a failure into an [ActionError].
async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ActionError> {
    let status = response.status();

    if status.is_success() {
        return response
            .json::<T>()
            .await
            .map_err(|err| ActionError::Network(anyhow::Error::new(err).context("invalid response body")));
    }

    let message = match response.json::<ErrorResponse>().await {
        Ok(body) => body.error,
        Err(_) => status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string(),
    };
    warn!(status = status.as_u16(), %message, "request rejected");

    if status == StatusCode::NOT_FOUND {
        return Err(ActionError::NotFound(message));
    }

    Err(ActionError::Rejected {
        status: status.as_u16(),
        message,
    })
}

fn network_error(err: reqwest::Error) -> ActionError {
    ActionError::Network(anyhow::Error::new(err).context("could not reach the rooms api"))
}

#[async_trait]
impl RoomsApi for HttpRoomsApi {
    async fn create_room(&self, owner: &str) -> Result<String, ActionError> {
        let url = self.endpoint(&["rooms"])?;
        debug!(%url, owner, "creating room");

        let response = self
            .client
            .post(url)
            .json(&CreateRoomRequest {
                owner: owner.to_string(),
            })
            .send()
            .await
            .map_err(network_error)?;
        let created: CreateRoomResponse = read_json(response).await?;

        if created.room_id.is_empty() {
            return Err(ActionError::Network(anyhow!("the created room has no id")));
        }

        Ok(created.room_id)
    }

    async fn post_message(
        &self,
        room_id: &str,
        from: &str,
        message: &str,
    ) -> Result<String, ActionError> {
        let url = self.endpoint(&["rooms", room_id, "messages"])?;
        debug!(%url, from, "posting message");

        let response = self
            .client
            .post(url)
            .json(&PostMessageRequest {
                from: from.to_string(),
                message: message.to_string(),
            })
            .send()
            .await
            .map_err(network_error)?;
        let posted: PostMessageResponse = read_json(response).await?;

        Ok(posted.id)
    }
}
