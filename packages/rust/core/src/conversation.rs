//! Conversation state for one answer turn.
//!
//! A [`Conversation`] is the ordered list of role-tagged messages the model
//! sees. Per-section screening never mutates it: [`Conversation::scoped`]
//! lends out the base messages plus one disposable note. The only in-place
//! edit is folding extracts into a paper's placeholder note.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use scholarbot_document::{DocumentId, arxiv};
use scholarbot_shared::{ChatMessage, Result, Role, ScholarbotError};

use crate::prompts;

static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://[^\s<>|]+").expect("valid link regex"));

// ---------------------------------------------------------------------------
// Papers
// ---------------------------------------------------------------------------

/// A paper referenced in the conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaperRef {
    pub id: DocumentId,
    /// Index of the paper's placeholder note in the conversation.
    pub note_index: usize,
}

/// Bibliographic details used for a paper's placeholder note.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PaperNote {
    pub title: String,
    pub abstract_text: String,
}

/// One message of a chat thread, as delivered by the transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadMessage {
    /// Whether the bot itself posted the message.
    #[serde(default)]
    pub from_bot: bool,
    pub text: String,
}

/// arXiv links in a message, in order of appearance, without duplicates.
pub fn paper_links(text: &str) -> Vec<Url> {
    let mut links: Vec<Url> = Vec::new();
    for m in LINK_RE.find_iter(text) {
        let raw = m.as_str().trim_end_matches(['.', ',', ')', ';']);
        let Ok(url) = Url::parse(raw) else {
            continue;
        };
        if arxiv::is_paper_url(&url) && !links.contains(&url) {
            links.push(url);
        }
    }
    links
}

// ---------------------------------------------------------------------------
// Conversation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a conversation from a chat thread.
    ///
    /// Bot messages become assistant turns, everything else human turns. Each
    /// arXiv link in a human message is followed by a placeholder note built
    /// from `lookup`; links `lookup` knows nothing about are left out.
    pub fn from_thread(
        thread: &[ThreadMessage],
        mut lookup: impl FnMut(&DocumentId) -> Option<PaperNote>,
    ) -> (Self, Vec<PaperRef>) {
        let mut conversation = Self::new();
        let mut papers: Vec<PaperRef> = Vec::new();

        for message in thread {
            if message.from_bot {
                conversation.push(ChatMessage::assistant(&message.text));
                continue;
            }

            conversation.push(ChatMessage::human(&message.text));
            for link in paper_links(&message.text) {
                let id = DocumentId::Url(link);
                if papers.iter().any(|p| p.id == id) {
                    continue;
                }
                if let Some(note) = lookup(&id) {
                    papers.push(conversation.add_paper(id, &note));
                }
            }
        }

        (conversation, papers)
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// Append a paper's placeholder note and return its reference.
    pub fn add_paper(&mut self, id: DocumentId, note: &PaperNote) -> PaperRef {
        let note_index = self.messages.len();
        self.push(ChatMessage::system(prompts::article_note(
            &note.title,
            &note.abstract_text,
        )));
        PaperRef { id, note_index }
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn as_slice(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// All messages, borrowed, ready for a model call.
    pub fn messages(&self) -> Vec<&ChatMessage> {
        self.messages.iter().collect()
    }

    /// The base messages followed by one disposable `extra` message.
    pub fn scoped<'a>(&'a self, extra: &'a ChatMessage) -> Vec<&'a ChatMessage> {
        self.messages.iter().chain(std::iter::once(extra)).collect()
    }

    /// Text of the most recent human message.
    pub fn pending_question(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::Human)
            .map(|m| m.content.as_str())
    }

    /// Append `addition` to the system note at `index`, on a new line.
    ///
    /// An empty addition leaves the note untouched.
    pub fn append_to_note(&mut self, index: usize, addition: &str) -> Result<()> {
        let note = self.messages.get_mut(index).ok_or_else(|| {
            ScholarbotError::validation(format!("no message at index {index}"))
        })?;
        if note.role != Role::System {
            return Err(ScholarbotError::validation(format!(
                "message {index} is not a system note"
            )));
        }
        if addition.is_empty() {
            return Ok(());
        }
        note.content.push('\n');
        note.content.push_str(addition);
        Ok(())
    }
}

/// Build a `lookup` for [`Conversation::from_thread`] from prepared notes.
pub fn note_lookup(
    notes: &HashMap<DocumentId, PaperNote>,
) -> impl FnMut(&DocumentId) -> Option<PaperNote> + '_ {
    move |id| notes.get(id).cloned()
}
