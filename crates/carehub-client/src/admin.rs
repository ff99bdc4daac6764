//! Team and office administration calls
//!
//! Thin wrappers over [`Client::post`]; they get the same token refresh and
//! paywall handling as any other request.

use serde_json::json;

use crate::client::Client;
use crate::error::Result;
use crate::request::Response;

impl Client {
    /// Deactivate a user in every office.
    pub async fn deactivate_user_global(
        &self,
        user_id: u64,
        reason: Option<&str>,
    ) -> Result<Response> {
        self.post(
            "/users/deactivate/",
            json!({ "user_id": user_id, "reason": reason.unwrap_or_default() }),
        )
        .await
    }

    pub async fn reactivate_user_global(
        &self,
        user_id: u64,
        reason: Option<&str>,
    ) -> Result<Response> {
        self.post(
            "/users/reactivate/",
            json!({ "user_id": user_id, "reason": reason.unwrap_or_default() }),
        )
        .await
    }

    pub async fn deactivate_user_in_office(
        &self,
        user_id: u64,
        office_id: u64,
        reason: Option<&str>,
    ) -> Result<Response> {
        self.post(
            "/users/deactivate/",
            json!({
                "user_id": user_id,
                "office_id": office_id,
                "reason": reason.unwrap_or_default(),
            }),
        )
        .await
    }

    pub async fn reactivate_user_in_office(
        &self,
        user_id: u64,
        office_id: u64,
        reason: Option<&str>,
    ) -> Result<Response> {
        self.post(
            "/users/reactivate/",
            json!({
                "user_id": user_id,
                "office_id": office_id,
                "reason": reason.unwrap_or_default(),
            }),
        )
        .await
    }

    pub async fn grant_role(
        &self,
        user_id: u64,
        office_id: u64,
        role: &str,
        reason: Option<&str>,
    ) -> Result<Response> {
        self.change_role("/roles/grant/", user_id, office_id, role, reason)
            .await
    }

    pub async fn revoke_role(
        &self,
        user_id: u64,
        office_id: u64,
        role: &str,
        reason: Option<&str>,
    ) -> Result<Response> {
        self.change_role("/roles/revoke/", user_id, office_id, role, reason)
            .await
    }

    pub async fn archive_office(&self, office_id: u64, reason: Option<&str>) -> Result<Response> {
        self.post(
            &format!("/offices/{office_id}/archive/"),
            json!({ "reason": reason.unwrap_or_default() }),
        )
        .await
    }

    pub async fn unarchive_office(&self, office_id: u64, reason: Option<&str>) -> Result<Response> {
        self.post(
            &format!("/offices/{office_id}/unarchive/"),
            json!({ "reason": reason.unwrap_or_default() }),
        )
        .await
    }

    async fn change_role(
        &self,
        path: &str,
        user_id: u64,
        office_id: u64,
        role: &str,
        reason: Option<&str>,
    ) -> Result<Response> {
        self.post(
            path,
            json!({
                "user_id": user_id,
                "office_id": office_id,
                "role": role,
                "reason": reason.unwrap_or_default(),
            }),
        )
        .await
    }
}
