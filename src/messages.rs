use std::sync::Arc;
use tracing::{debug, info};

use crate::backend::MessageStore;
use crate::error::{AppError, Result};
use crate::models::{Listing, Message, NewMessage};
use crate::session::SessionStore;
use crate::validation;

const ACTION: &str = "send messages";

/// Messaging between the signed-in identity and agents.
pub struct Messenger {
    session: Arc<SessionStore>,
    store: Arc<dyn MessageStore>,
}

impl Messenger {
    pub fn new(session: Arc<SessionStore>, store: Arc<dyn MessageStore>) -> Self {
        Self { session, store }
    }

    pub async fn send(
        &self,
        recipient_id: &str,
        content: &str,
        subject: Option<String>,
        property_id: Option<i64>,
    ) -> Result<Message> {
        let sender = self.session.require_member(ACTION)?;
        validation::validate_message(content)?;

        let message = NewMessage {
            sender_id: sender.id,
            recipient_id: recipient_id.to_string(),
            content: content.trim().to_string(),
            subject,
            property_id,
        };
        let sent = self.store.send_message(&message).await?;
        info!("Message {} sent to {}", sent.id, recipient_id);
        Ok(sent)
    }

    /// Message to the agent of `listing`, subject taken from its title.
    pub async fn contact_agent(&self, listing: &Listing, content: &str) -> Result<Message> {
        let agent_id = listing
            .agent_id
            .as_deref()
            .ok_or_else(|| AppError::NotFound("agent".to_string()))?;
        self.send(
            agent_id,
            content,
            Some(format!("Inquiry about {}", listing.title)),
            Some(listing.id),
        )
        .await
    }

    /// Sent and received, newest first.
    pub async fn inbox(&self) -> Result<Vec<Message>> {
        let me = self.session.require_member(ACTION)?;
        self.store.messages_for(&me.id).await
    }

    /// Both directions with `other_id`, oldest first.
    pub async fn conversation(&self, other_id: &str) -> Result<Vec<Message>> {
        let me = self.session.require_member(ACTION)?;
        self.store.conversation(&me.id, other_id).await
    }

    pub async fn mark_read(&self, message_id: &str) -> Result<()> {
        self.session.require_member(ACTION)?;
        debug!("Marking message {} read", message_id);
        self.store.mark_read(message_id).await
    }

    pub async fn unread_count(&self) -> Result<usize> {
        match self.session.current() {
            Some(identity) if !identity.is_guest() => self.store.unread_count(&identity.id).await,
            _ => Ok(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::sample::sample_listings;
    use crate::backend::MemoryBackend;
    use crate::models::IdentityKind;
    use crate::session::MemoryStorage;

    struct Fixture {
        session: Arc<SessionStore>,
        messenger: Messenger,
        buyer: String,
        agent: String,
    }

    async fn fixture() -> Fixture {
        let backend = Arc::new(MemoryBackend::new());
        let buyer =
            backend.insert_account("buyer@test.com", "secret1", "Buyer", IdentityKind::User);
        let agent =
            backend.insert_account("agent@test.com", "secret1", "Agent", IdentityKind::Agent);
        let session = Arc::new(SessionStore::new(
            backend.clone(),
            Arc::new(MemoryStorage::new()),
            chrono::Duration::hours(24),
        ));
        let messenger = Messenger::new(session.clone(), backend);
        Fixture {
            session,
            messenger,
            buyer,
            agent,
        }
    }

    #[tokio::test]
    async fn guests_cannot_send() {
        let f = fixture().await;
        f.session.guest_sign_in().await.unwrap();
        let err = f.messenger.send(&f.agent, "Hello", None, None).await.unwrap_err();
        assert!(err.requires_sign_up());
        assert_eq!(f.messenger.unread_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn empty_content_is_rejected() {
        let f = fixture().await;
        f.session.sign_in("buyer@test.com", "secret1").await.unwrap();
        let err = f.messenger.send(&f.agent, "   ", None, None).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { field: "content", .. }));
    }

    #[tokio::test]
    async fn conversation_and_unread_flow() {
        let f = fixture().await;
        f.session.sign_in("buyer@test.com", "secret1").await.unwrap();
        f.messenger.send(&f.agent, "Is it available?", None, Some(1)).await.unwrap();

        f.session.sign_in("agent@test.com", "secret1").await.unwrap();
        assert_eq!(f.messenger.unread_count().await.unwrap(), 1);
        let inbox = f.messenger.inbox().await.unwrap();
        assert_eq!(inbox.len(), 1);
        f.messenger.mark_read(&inbox[0].id).await.unwrap();
        assert_eq!(f.messenger.unread_count().await.unwrap(), 0);
        f.messenger.send(&f.buyer, "Yes it is", None, Some(1)).await.unwrap();

        let thread = f.messenger.conversation(&f.buyer).await.unwrap();
        let contents: Vec<&str> = thread.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["Is it available?", "Yes it is"]);
    }

    #[tokio::test]
    async fn contact_agent_needs_a_listing_agent() {
        let f = fixture().await;
        f.session.sign_in("buyer@test.com", "secret1").await.unwrap();

        let mut listing = sample_listings().remove(0);
        let sent = f.messenger.contact_agent(&listing, "Tour please").await.unwrap();
        assert_eq!(sent.recipient_id.as_deref(), Some("agent-sarah"));
        assert_eq!(sent.property_id, Some(1));

        listing.agent_id = None;
        let err = f.messenger.contact_agent(&listing, "Hello?").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
