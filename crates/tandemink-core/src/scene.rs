//! Scene store: every synchronized drawable plus render caches.

use crate::model::{MediaKind, MediaObject, ObjectId, ObjectRef, Stroke, TextLabel};
use crate::viewport::Viewport;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use kurbo::{Point, Rect};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use thiserror::Error;

/// Approximate glyph advance relative to font size, used for text hit boxes.
const GLYPH_ADVANCE: f64 = 0.6;
/// Line height relative to font size.
const LINE_HEIGHT: f64 = 1.2;
/// Horizontal slack around a text box, in screen pixels.
const TEXT_HIT_PADDING: f64 = 12.0;
/// Texts never render smaller than this many screen pixels.
pub const MIN_TEXT_PX: f64 = 6.0;

/// Errors decoding a media source.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Malformed data URL")]
    MalformedDataUrl,
    #[error("Invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// Decoded media resource shared between the scene and the renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaData {
    /// Inline bytes extracted from a `data:` URL.
    Inline { mime: Option<String>, bytes: Vec<u8> },
    /// Anything that is not a data URL is handed to the host as-is.
    External(String),
}

/// Handle to a decoded media element.
#[derive(Debug, PartialEq, Eq)]
pub struct MediaHandle {
    pub id: ObjectId,
    pub kind: MediaKind,
    pub data: MediaData,
}

/// Decode a media source string.
pub fn decode_source(source: &str) -> Result<MediaData, MediaError> {
    let Some(rest) = source.strip_prefix("data:") else {
        return Ok(MediaData::External(source.to_string()));
    };
    let (header, payload) = rest.split_once(',').ok_or(MediaError::MalformedDataUrl)?;
    let (mime, is_base64) = match header.strip_suffix(";base64") {
        Some(mime) => (mime, true),
        None => (header, false),
    };
    let mime = (!mime.is_empty()).then(|| mime.to_string());
    let bytes = if is_base64 {
        STANDARD.decode(payload.trim())?
    } else {
        payload.as_bytes().to_vec()
    };
    Ok(MediaData::Inline { mime, bytes })
}

/// Lazily populated id → decoded handle map.
///
/// Populated on first reference through a shared borrow so the renderer can
/// fill it while only reading the scene. Invalidated on clear and on re-add.
#[derive(Debug, Default)]
pub struct MediaCache {
    entries: RefCell<HashMap<ObjectId, Rc<MediaHandle>>>,
}

impl MediaCache {
    /// Get the decoded handle for `media`, decoding it on first use.
    pub fn resolve(&self, media: &MediaObject) -> Option<Rc<MediaHandle>> {
        if let Some(handle) = self.entries.borrow().get(&media.id) {
            return Some(Rc::clone(handle));
        }
        match decode_source(&media.source) {
            Ok(data) => {
                let handle = Rc::new(MediaHandle {
                    id: media.id.clone(),
                    kind: media.kind,
                    data,
                });
                self.entries
                    .borrow_mut()
                    .insert(media.id.clone(), Rc::clone(&handle));
                Some(handle)
            }
            Err(e) => {
                log::warn!("Cannot decode {} {}: {}", media.kind.name(), media.id, e);
                None
            }
        }
    }

    pub fn invalidate(&self, id: &ObjectId) {
        self.entries.borrow_mut().remove(id);
    }

    pub fn invalidate_all(&self) {
        self.entries.borrow_mut().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

/// Everything the relay synchronizes, as seen by this client.
#[derive(Debug, Default)]
pub struct Scene {
    /// Append-only stroke log, back to front.
    strokes: Vec<Stroke>,
    texts: HashMap<ObjectId, TextLabel>,
    media: HashMap<ObjectId, MediaObject>,
    /// Stacking order of texts and media, back to front.
    z_order: Vec<ObjectRef>,
    media_cache: MediaCache,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    pub fn text(&self, id: &ObjectId) -> Option<&TextLabel> {
        self.texts.get(id)
    }

    pub fn media(&self, id: &ObjectId) -> Option<&MediaObject> {
        self.media.get(id)
    }

    pub fn text_count(&self) -> usize {
        self.texts.len()
    }

    pub fn media_count(&self) -> usize {
        self.media.len()
    }

    pub fn media_cache(&self) -> &MediaCache {
        &self.media_cache
    }

    /// Check if the scene holds nothing at all.
    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty() && self.texts.is_empty() && self.media.is_empty()
    }

    /// Append a stroke. Duplicates are kept.
    pub fn push_stroke(&mut self, stroke: Stroke) {
        self.strokes.push(stroke);
    }

    /// Insert a text label, or replace the one with the same id in place.
    pub fn upsert_text(&mut self, label: TextLabel) {
        let id = label.id.clone();
        if self.texts.insert(id.clone(), label).is_none() {
            self.z_order.push(ObjectRef::Text(id));
        }
    }

    /// Insert a media object, or replace the one with the same id in place.
    pub fn upsert_media(&mut self, media: MediaObject) {
        let id = media.id.clone();
        self.media_cache.invalidate(&id);
        if self.media.insert(id.clone(), media).is_none() {
            self.z_order.push(ObjectRef::Media(id));
        }
    }

    pub fn text_mut(&mut self, id: &ObjectId) -> Option<&mut TextLabel> {
        self.texts.get_mut(id)
    }

    pub fn media_mut(&mut self, id: &ObjectId) -> Option<&mut MediaObject> {
        self.media.get_mut(id)
    }

    /// Move an object. Returns false when the id is unknown.
    pub fn set_position(&mut self, target: &ObjectRef, position: Point) -> bool {
        match target {
            ObjectRef::Text(id) => self.texts.get_mut(id).map(|t| t.position = position).is_some(),
            ObjectRef::Media(id) => self.media.get_mut(id).map(|m| m.position = position).is_some(),
        }
    }

    /// Adopt a complete state wholesale.
    pub fn replace_all(
        &mut self,
        strokes: Vec<Stroke>,
        texts: Vec<TextLabel>,
        media: Vec<MediaObject>,
    ) {
        self.clear();
        self.strokes = strokes;
        for label in texts {
            self.upsert_text(label);
        }
        for item in media {
            self.upsert_media(item);
        }
    }

    /// Empty every container and drop decoded media.
    pub fn clear(&mut self) {
        self.strokes.clear();
        self.texts.clear();
        self.media.clear();
        self.z_order.clear();
        self.media_cache.invalidate_all();
    }

    /// Texts and media, back to front.
    pub fn objects_ordered(&self) -> impl Iterator<Item = SceneObject<'_>> {
        self.z_order.iter().filter_map(|r| match r {
            ObjectRef::Text(id) => self.texts.get(id).map(SceneObject::Text),
            ObjectRef::Media(id) => self.media.get(id).map(SceneObject::Media),
        })
    }

    /// Topmost object under a screen point.
    ///
    /// `hit_radius` is in screen pixels, so the grabbable area has the same
    /// apparent size at every zoom level.
    pub fn object_at(&self, viewport: &Viewport, screen: Point, hit_radius: f64) -> Option<ObjectRef> {
        self.z_order
            .iter()
            .rev()
            .find(|r| match r {
                ObjectRef::Text(id) => self
                    .texts
                    .get(id)
                    .is_some_and(|t| text_hit(t, viewport, screen, hit_radius)),
                ObjectRef::Media(id) => self.media.get(id).is_some_and(|m| {
                    viewport.world_to_screen(m.position).distance(screen) <= hit_radius
                }),
            })
            .cloned()
    }
}

/// Borrowed view of one movable object.
#[derive(Debug, Clone, Copy)]
pub enum SceneObject<'a> {
    Text(&'a TextLabel),
    Media(&'a MediaObject),
}

/// Screen-space box a text label roughly occupies.
pub fn text_screen_box(label: &TextLabel, viewport: &Viewport) -> Rect {
    let font_px = (label.font_size * viewport.scale()).max(MIN_TEXT_PX);
    let width = label.content.chars().count() as f64 * font_px * GLYPH_ADVANCE;
    let height = font_px * LINE_HEIGHT;
    let origin = viewport.world_to_screen(label.position);
    Rect::new(
        origin.x - TEXT_HIT_PADDING,
        origin.y - height / 2.0,
        origin.x + width + TEXT_HIT_PADDING,
        origin.y + height / 2.0,
    )
}

fn text_hit(label: &TextLabel, viewport: &Viewport, screen: Point, hit_radius: f64) -> bool {
    viewport.world_to_screen(label.position).distance(screen) <= hit_radius
        || text_screen_box(label, viewport).contains(screen)
}
