//! Async driver that connects the chat view to the stream client.
//!
//! Stream tasks only parse and forward. Every event is applied to the
//! [`ChatView`] here, on the caller's task, in delivery order.

use std::collections::HashMap;

use anyhow::Result;
use tokio::sync::mpsc;

use crate::chat::view::{ChatEffect, ChatView};
use crate::config::AttachmentsConfig;
use crate::input::InputInfo;
use crate::stream::{StreamClient, StreamMessage, Subscription};

pub struct ChatRuntime {
    client: StreamClient,
    limits: AttachmentsConfig,
    view: ChatView,
    tx: mpsc::UnboundedSender<StreamMessage>,
    rx: mpsc::UnboundedReceiver<StreamMessage>,
    subscriptions: HashMap<String, Subscription>,
}

impl ChatRuntime {
    pub fn new(client: StreamClient, limits: AttachmentsConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            client,
            limits,
            view: ChatView::new(),
            tx,
            rx,
            subscriptions: HashMap::new(),
        }
    }

    pub fn view(&self) -> &ChatView {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut ChatView {
        &mut self.view
    }

    /// Validates `input`, appends a loading entry and starts streaming.
    ///
    /// Returns the new request id. Invalid input opens no stream.
    pub fn send_message(&mut self, session_id: &str, input: &InputInfo) -> Result<String> {
        input.validate(&self.limits)?;

        let request_id = uuid::Uuid::new_v4().to_string();
        let request = self.view.begin_request(session_id, &request_id, input)?;
        let subscription = self.client.open(request, self.tx.clone());
        self.subscriptions.insert(request_id.clone(), subscription);

        tracing::info!(session_id, request_id = %request_id, "Message sent");
        Ok(request_id)
    }

    /// Waits for the next stream event and applies it.
    ///
    /// Returns `None` when no request is pending.
    pub async fn next_effects(&mut self) -> Option<Vec<ChatEffect>> {
        while self.view.has_pending() {
            let StreamMessage { request_id, event } = self.rx.recv().await?;
            let effects = self.view.apply(&request_id, event);
            if self
                .view
                .entry(&request_id)
                .is_some_and(|entry| !entry.loading)
            {
                self.subscriptions.remove(&request_id);
            }
            if !effects.is_empty() {
                return Some(effects);
            }
        }
        None
    }

    /// Pumps events until every attached request has ended.
    pub async fn run_until_idle<F>(&mut self, mut on_effect: F)
    where
        F: FnMut(&ChatView, &ChatEffect),
    {
        while let Some(effects) = self.next_effects().await {
            for effect in &effects {
                on_effect(&self.view, effect);
            }
        }
    }

    /// Stops a request on user demand. Its entry is marked cancelled.
    pub fn stop(&mut self, request_id: &str) -> Vec<ChatEffect> {
        if let Some(subscription) = self.subscriptions.remove(request_id) {
            subscription.cancel();
        }
        self.view.stop(request_id)
    }

    /// Detaches every running stream, leaving entries as they are.
    pub fn detach_all(&mut self) {
        for (request_id, subscription) in self.subscriptions.drain() {
            subscription.cancel();
            self.view.detach(&request_id);
        }
    }
}

impl Drop for ChatRuntime {
    fn drop(&mut self) {
        for subscription in self.subscriptions.values() {
            subscription.cancel();
        }
    }
}
