//! Bridge between local scene mutations and the relay.
//!
//! Outbound messages are queued as JSON text frames for the host to flush;
//! inbound frames are merged into the scene in arrival order, last write wins.

use crate::model::{MediaKind, MediaObject, ObjectRef, Stroke, TextLabel};
use crate::scene::Scene;
use crate::sync::{
    ClearRequest, ClientMessage, InitPayload, ServerMessage, SyncError, decode_frame, encode_frame,
};

/// What an inbound frame did to the scene.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncNotice {
    /// The scene was replaced by an `init` snapshot.
    Initialized,
    /// A peer cleared the board.
    Cleared,
    /// Our clear request was refused.
    ClearDenied { message: String },
    /// A stroke or object was added or changed.
    Updated,
    /// A move for an object we do not have.
    Ignored,
}

/// Queues outgoing frames and applies incoming ones.
#[derive(Debug, Default)]
pub struct SyncChannel {
    /// Pending outgoing messages (JSON strings).
    outgoing: Vec<String>,
}

impl SyncChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a message. Delivery is fire-and-forget.
    pub fn send(&mut self, msg: &ClientMessage) {
        match encode_frame(msg) {
            Ok(json) => self.outgoing.push(json),
            Err(e) => log::warn!("Dropping unencodable message: {e}"),
        }
    }

    pub fn send_draw(&mut self, stroke: &Stroke) {
        self.send(&ClientMessage::Draw(stroke.into()));
    }

    pub fn send_text_add(&mut self, label: &TextLabel) {
        self.send(&ClientMessage::TextAdd(label.into()));
    }

    pub fn send_text_move(&mut self, label: &TextLabel) {
        self.send(&ClientMessage::TextMove(label.into()));
    }

    pub fn send_media_add(&mut self, media: &MediaObject) {
        self.send(&ClientMessage::MediaAdd(media.into()));
    }

    pub fn send_media_move(&mut self, media: &MediaObject) {
        self.send(&ClientMessage::MediaMove(media.into()));
    }

    /// Announce the current state of a moved object.
    pub fn send_move(&mut self, scene: &Scene, target: &ObjectRef) {
        match target {
            ObjectRef::Text(id) => {
                if let Some(label) = scene.text(id) {
                    self.send_text_move(label);
                }
            }
            ObjectRef::Media(id) => {
                if let Some(media) = scene.media(id) {
                    self.send_media_move(media);
                }
            }
        }
    }

    /// Ask the relay to wipe the board. The relay checks the password.
    pub fn send_clear(&mut self, password: &str) {
        self.send(&ClientMessage::Clear(ClearRequest {
            password: password.to_string(),
        }));
    }

    /// Take pending outgoing messages (drains the queue).
    pub fn take_outgoing(&mut self) -> Vec<String> {
        std::mem::take(&mut self.outgoing)
    }

    /// Check if there are pending outgoing messages.
    pub fn has_outgoing(&self) -> bool {
        !self.outgoing.is_empty()
    }

    /// Decode and merge one inbound frame.
    pub fn apply(&mut self, json: &str, scene: &mut Scene) -> Result<SyncNotice, SyncError> {
        let msg = decode_frame(json)?;
        log::trace!("Inbound {}", msg.name());
        Ok(apply_message(msg, scene))
    }
}

/// Merge an already-decoded message into the scene.
pub fn apply_message(msg: ServerMessage, scene: &mut Scene) -> SyncNotice {
    match msg {
        ServerMessage::Init(init) => {
            apply_init(init, scene);
            SyncNotice::Initialized
        }
        ServerMessage::Draw(stroke) => {
            scene.push_stroke(stroke.into());
            SyncNotice::Updated
        }
        ServerMessage::TextAdd(text) => {
            scene.upsert_text(text.into());
            SyncNotice::Updated
        }
        ServerMessage::TextMove(update) => match scene.text_mut(&update.id) {
            Some(label) => {
                update.apply_to(label);
                SyncNotice::Updated
            }
            None => {
                log::debug!("text_move for unknown id {}", update.id);
                SyncNotice::Ignored
            }
        },
        ServerMessage::MediaAdd(media) => {
            scene.upsert_media(media.into_media(MediaKind::Image));
            SyncNotice::Updated
        }
        ServerMessage::MediaMove(update) => match scene.media_mut(&update.id) {
            Some(media) => {
                update.apply_to(media);
                SyncNotice::Updated
            }
            None => {
                log::debug!("media_move for unknown id {}", update.id);
                SyncNotice::Ignored
            }
        },
        ServerMessage::Clear => {
            scene.clear();
            log::info!("Board cleared by relay");
            SyncNotice::Cleared
        }
        ServerMessage::ClearDenied(denied) => {
            log::info!("Clear denied: {}", denied.msg);
            SyncNotice::ClearDenied { message: denied.msg }
        }
    }
}

fn apply_init(init: InitPayload, scene: &mut Scene) {
    let strokes: Vec<Stroke> = init.lines.into_iter().map(Stroke::from).collect();
    let texts: Vec<TextLabel> = init.texts.into_iter().map(TextLabel::from).collect();
    let media: Vec<MediaObject> = init
        .images
        .into_iter()
        .map(|m| m.into_media(MediaKind::Image))
        .chain(init.videos.into_iter().map(|m| m.into_media(MediaKind::Video)))
        .collect();
    log::info!(
        "Adopting snapshot: {} strokes, {} texts, {} media",
        strokes.len(),
        texts.len(),
        media.len()
    );
    scene.replace_all(strokes, texts, media);
}
