use time::OffsetDateTime;
use tracing::{error, warn};

use super::supabase::SupabaseClient;
use crate::server::models::chat::{
    Conversation, ConversationWithMessages, CreateConversationRequest, CreateMessageRequest,
    Message, NewMessage, Role,
};

pub const DEFAULT_CONVERSATION_TITLE: &str = "New Conversation";

const TITLE_MAX_CHARS: usize = 30;

/// Conversation and message persistence.
///
/// Backend failures never propagate to callers: they are logged here, reads
/// come back empty and writes report `None` or `false`. Request handling
/// decides what that means for the client.
pub struct ChatStore {
    db: SupabaseClient,
}

#[derive(serde::Serialize)]
struct TitleUpdate {
    title: String,
    #[serde(with = "time::serde::rfc3339")]
    updated_at: OffsetDateTime,
}

#[derive(serde::Serialize)]
struct ConversationTouch {
    #[serde(with = "time::serde::rfc3339")]
    updated_at: OffsetDateTime,
}

impl ChatStore {
    pub fn new(db: SupabaseClient) -> Self {
        Self { db }
    }

    pub async fn create_conversation(
        &self,
        user_id: i64,
        title: Option<&str>,
    ) -> Option<Conversation> {
        let title = match title {
            Some(t) if !t.trim().is_empty() => t.to_string(),
            _ => DEFAULT_CONVERSATION_TITLE.to_string(),
        };
        let request = CreateConversationRequest { user_id, title };

        match self
            .db
            .table("conversations")
            .insert::<_, Conversation>(&[request])
            .await
        {
            Ok(rows) => rows.into_iter().next(),
            Err(e) => {
                error!("Failed to create conversation: {}", e);
                None
            }
        }
    }

    pub async fn save_message(
        &self,
        conversation_id: i64,
        role: Role,
        content: &str,
    ) -> Option<Message> {
        let request = CreateMessageRequest {
            conversation_id,
            role,
            content: content.to_string(),
        };

        match self
            .db
            .table("messages")
            .insert::<_, Message>(&[request])
            .await
        {
            Ok(rows) => {
                self.touch_conversation(conversation_id).await;
                rows.into_iter().next()
            }
            Err(e) => {
                error!("Failed to save message: {}", e);
                None
            }
        }
    }

    pub async fn save_messages(
        &self,
        conversation_id: i64,
        messages: &[NewMessage],
    ) -> Vec<Message> {
        if messages.is_empty() {
            return Vec::new();
        }

        let requests: Vec<CreateMessageRequest> = messages
            .iter()
            .map(|m| CreateMessageRequest {
                conversation_id,
                role: m.role,
                content: m.content.clone(),
            })
            .collect();

        match self
            .db
            .table("messages")
            .insert::<_, Message>(&requests)
            .await
        {
            Ok(rows) => {
                self.touch_conversation(conversation_id).await;
                rows
            }
            Err(e) => {
                error!("Failed to save messages: {}", e);
                Vec::new()
            }
        }
    }

    pub async fn get_conversations(&self, user_id: i64, limit: usize) -> Vec<Conversation> {
        match self
            .db
            .table("conversations")
            .eq("user_id", user_id)
            .order("updated_at", false)
            .limit(limit)
            .select()
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                error!("Failed to fetch conversations: {}", e);
                Vec::new()
            }
        }
    }

    pub async fn get_conversation_messages(&self, conversation_id: i64) -> Vec<Message> {
        match self
            .db
            .table("messages")
            .eq("conversation_id", conversation_id)
            .order("created_at", true)
            .select()
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                error!("Failed to fetch messages: {}", e);
                Vec::new()
            }
        }
    }

    pub async fn get_conversation_with_messages(
        &self,
        conversation_id: i64,
    ) -> Option<ConversationWithMessages> {
        let conversation: Conversation = match self
            .db
            .table("conversations")
            .eq("id", conversation_id)
            .select()
            .await
        {
            Ok(rows) => rows.into_iter().next()?,
            Err(e) => {
                error!("Failed to fetch conversation: {}", e);
                return None;
            }
        };

        let messages = self.get_conversation_messages(conversation_id).await;
        Some(ConversationWithMessages {
            conversation,
            messages,
        })
    }

    pub async fn update_conversation_title(&self, conversation_id: i64, title: &str) -> bool {
        let payload = TitleUpdate {
            title: title.to_string(),
            updated_at: OffsetDateTime::now_utc(),
        };

        match self
            .db
            .table("conversations")
            .eq("id", conversation_id)
            .update(&payload)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to update conversation title: {}", e);
                false
            }
        }
    }

    pub async fn delete_conversation(&self, conversation_id: i64) -> bool {
        match self
            .db
            .table("conversations")
            .eq("id", conversation_id)
            .delete()
            .await
        {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to delete conversation: {}", e);
                false
            }
        }
    }

    // Messages land through inserts, so the parent row's updated_at has to be
    // bumped by hand for the recency ordering of get_conversations.
    async fn touch_conversation(&self, conversation_id: i64) {
        let payload = ConversationTouch {
            updated_at: OffsetDateTime::now_utc(),
        };

        if let Err(e) = self
            .db
            .table("conversations")
            .eq("id", conversation_id)
            .update(&payload)
            .await
        {
            warn!("Failed to bump conversation updated_at: {}", e);
        }
    }
}

/// Derive a conversation title from the first user message: trimmed, and cut
/// to 30 characters with a "..." suffix when longer.
pub fn generate_conversation_title(first_message: &str) -> String {
    let trimmed = first_message.trim();
    if trimmed.chars().count() <= TITLE_MAX_CHARS {
        trimmed.to_string()
    } else {
        let mut title: String = trimmed.chars().take(TITLE_MAX_CHARS).collect();
        title.push_str("...");
        title
    }
}
