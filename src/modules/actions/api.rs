// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use futures::{future::BoxFuture, FutureExt};
use serde::Serialize;

use crate::modules::{
    common::http::ApiClient, error::MailSyncResult, mailbox::model::LabelId,
};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Scope {
    Messages,
    Conversations,
}

impl Scope {
    pub fn path(&self) -> &'static str {
        match self {
            Scope::Messages => "messages",
            Scope::Conversations => "conversations",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum MutationKind {
    Label,
    Unlabel,
    Star,
    Unstar,
    Read,
    Unread,
    Delete,
    Archive,
}

impl MutationKind {
    pub fn endpoint(&self) -> &'static str {
        match self {
            MutationKind::Label => "label",
            MutationKind::Unlabel => "unlabel",
            MutationKind::Star => "star",
            MutationKind::Unstar => "unstar",
            MutationKind::Read => "read",
            MutationKind::Unread => "unread",
            MutationKind::Delete => "delete",
            MutationKind::Archive => "archive",
        }
    }
}

/// One call to the remote mutation API.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct MutationRequest {
    #[serde(skip)]
    pub scope: Scope,
    #[serde(skip)]
    pub kind: MutationKind,
    #[serde(rename = "IDs")]
    pub ids: Vec<String>,
    #[serde(rename = "LabelID", skip_serializing_if = "Option::is_none")]
    pub label_id: Option<LabelId>,
}

impl MutationRequest {
    pub fn new(scope: Scope, kind: MutationKind, ids: Vec<String>) -> Self {
        Self {
            scope,
            kind,
            ids,
            label_id: None,
        }
    }

    pub fn with_label(mut self, label_id: impl Into<LabelId>) -> Self {
        self.label_id = Some(label_id.into());
        self
    }

    pub fn path(&self) -> String {
        format!("{}/{}", self.scope.path(), self.kind.endpoint())
    }
}

/// Remote write side of the mailbox.
pub trait MutationApi: Send + Sync {
    fn send(&self, request: MutationRequest) -> BoxFuture<'static, MailSyncResult<()>>;
}

#[derive(Clone, Debug)]
pub struct HttpMutationApi {
    api: ApiClient,
}

impl HttpMutationApi {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

impl MutationApi for HttpMutationApi {
    fn send(&self, request: MutationRequest) -> BoxFuture<'static, MailSyncResult<()>> {
        let api = self.api.clone();
        async move {
            let _: serde_json::Value = api.put(&request.path(), &request).await?;
            Ok(())
        }
        .boxed()
    }
}
