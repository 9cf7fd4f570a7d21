//! Ordered content blocks and the structured content container.
//!
//! A [`Content`] is an ordered sequence of [`ContentBlock`]s. Insertion
//! order is authoritative: blocks are sent to providers and rendered
//! exactly in the order they were added, with no resorting.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Open string-keyed metadata attached to a block (style, caption, ...).
pub type Extras = Map<String, Value>;

/// Keys claimed by the block's own serialized form. They are filtered
/// out of `extras` so the serde representation stays unambiguous.
const RESERVED_EXTRA_KEYS: [&str; 2] = ["type", "content"];

/// The kind of an atomic content block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Text,
    Image,
    Json,
}

impl BlockKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Json => "json",
        }
    }
}

/// Payload of a content block, tagged with its kind.
///
/// Serializes as `{"type": "...", "content": ...}`, which is also the
/// block layout inside exported conversation files.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "content", rename_all = "lowercase")]
pub enum BlockPayload {
    /// Free text.
    Text(String),
    /// Local path or URL identifying an image.
    Image(String),
    /// Arbitrary JSON value.
    Json(Value),
}

impl BlockPayload {
    #[must_use]
    pub const fn kind(&self) -> BlockKind {
        match self {
            Self::Text(_) => BlockKind::Text,
            Self::Image(_) => BlockKind::Image,
            Self::Json(_) => BlockKind::Json,
        }
    }
}

/// One atomic piece of input/output content plus open metadata.
///
/// The payload is immutable after construction; `extras` stays mutable
/// through [`ContentBlock::set_extra`] until the block is serialized.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContentBlock {
    #[serde(flatten)]
    payload: BlockPayload,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    extras: Extras,
}

impl ContentBlock {
    #[must_use]
    pub fn new(payload: BlockPayload) -> Self {
        Self {
            payload,
            extras: Extras::new(),
        }
    }

    /// Build a block with an initial extras map. Reserved keys are
    /// dropped from the map.
    #[must_use]
    pub fn with_extras(payload: BlockPayload, extras: Extras) -> Self {
        let mut block = Self::new(payload);
        for (key, value) in extras {
            block.set_extra(key, value);
        }
        block
    }

    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(BlockPayload::Text(text.into()))
    }

    #[must_use]
    pub fn image(reference: impl Into<String>) -> Self {
        Self::new(BlockPayload::Image(reference.into()))
    }

    #[must_use]
    pub fn json(value: Value) -> Self {
        Self::new(BlockPayload::Json(value))
    }

    #[must_use]
    pub const fn kind(&self) -> BlockKind {
        self.payload.kind()
    }

    #[must_use]
    pub const fn payload(&self) -> &BlockPayload {
        &self.payload
    }

    #[must_use]
    pub const fn extras(&self) -> &Extras {
        &self.extras
    }

    /// Look up a metadata value.
    #[must_use]
    pub fn extra(&self, key: &str) -> Option<&Value> {
        self.extras.get(key)
    }

    /// Set a metadata value. Reserved keys (`type`, `content`) are
    /// silently ignored; they belong to the payload.
    pub fn set_extra(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        if RESERVED_EXTRA_KEYS.contains(&key.as_str()) {
            return;
        }
        self.extras.insert(key, value.into());
    }

    #[must_use]
    pub fn has_extra(&self, key: &str) -> bool {
        self.extras.contains_key(key)
    }

    fn extra_str(&self, key: &str) -> Option<&str> {
        self.extras.get(key).and_then(Value::as_str)
    }

    /// Human-readable rendering of this block.
    #[must_use]
    pub fn display_text(&self) -> String {
        match &self.payload {
            BlockPayload::Text(text) => match self.extra_str("style") {
                Some(style @ ("bold" | "italic")) => format!("[{style}]{text}[/{style}]"),
                _ => text.clone(),
            },
            BlockPayload::Image(reference) => {
                match self.extra_str("alt_text").or_else(|| self.extra_str("caption")) {
                    Some(note) => format!("[image: {reference} - {note}]"),
                    None => format!("[image: {reference}]"),
                }
            }
            BlockPayload::Json(value) => {
                let compact = serde_json::to_string(value).unwrap_or_default();
                match self.extra_str("source") {
                    Some(source) => format!("[json({source}): {compact}]"),
                    None => format!("[json: {compact}]"),
                }
            }
        }
    }
}

/// One unit of the mixed-item constructor: a payload plus the extras to
/// attach to the block it produces.
#[derive(Debug, Clone)]
pub struct ContentItem {
    payload: BlockPayload,
    extras: Extras,
}

impl ContentItem {
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            payload: BlockPayload::Text(text.into()),
            extras: Extras::new(),
        }
    }

    #[must_use]
    pub fn image(reference: impl Into<String>) -> Self {
        Self {
            payload: BlockPayload::Image(reference.into()),
            extras: Extras::new(),
        }
    }

    #[must_use]
    pub fn json(value: Value) -> Self {
        Self {
            payload: BlockPayload::Json(value),
            extras: Extras::new(),
        }
    }

    /// Attach a metadata entry to the block this item produces.
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extras.insert(key.into(), value.into());
        self
    }
}

impl From<&str> for ContentItem {
    fn from(text: &str) -> Self {
        Self::text(text)
    }
}

impl From<String> for ContentItem {
    fn from(text: String) -> Self {
        Self::text(text)
    }
}

impl From<ContentItem> for ContentBlock {
    fn from(item: ContentItem) -> Self {
        Self::with_extras(item.payload, item.extras)
    }
}

/// An ordered sequence of content blocks making up one logical input.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Content {
    blocks: Vec<ContentBlock>,
}

impl Content {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-text convenience constructor.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::new().add_text(text)
    }

    /// Build from mixed items, preserving their order verbatim.
    #[must_use]
    pub fn from_items<I>(items: I) -> Self
    where
        I: IntoIterator<Item = ContentItem>,
    {
        Self {
            blocks: items.into_iter().map(ContentBlock::from).collect(),
        }
    }

    /// Rebuild from already-constructed blocks (e.g. a parsed export).
    #[must_use]
    pub fn from_blocks(blocks: Vec<ContentBlock>) -> Self {
        Self { blocks }
    }

    /// Append a text block.
    #[must_use]
    pub fn add_text(mut self, text: impl Into<String>) -> Self {
        self.blocks.push(ContentBlock::text(text));
        self
    }

    /// Append a text block with metadata.
    #[must_use]
    pub fn add_text_with(mut self, text: impl Into<String>, extras: Extras) -> Self {
        self.blocks
            .push(ContentBlock::with_extras(BlockPayload::Text(text.into()), extras));
        self
    }

    /// Append an image block. The reference is stored as given; path
    /// resolution happens at provider-normalization time.
    #[must_use]
    pub fn add_image(mut self, reference: impl Into<String>) -> Self {
        self.blocks.push(ContentBlock::image(reference));
        self
    }

    /// Append an image block with metadata.
    #[must_use]
    pub fn add_image_with(mut self, reference: impl Into<String>, extras: Extras) -> Self {
        self.blocks.push(ContentBlock::with_extras(
            BlockPayload::Image(reference.into()),
            extras,
        ));
        self
    }

    /// Append a JSON block.
    #[must_use]
    pub fn add_json(mut self, value: Value) -> Self {
        self.blocks.push(ContentBlock::json(value));
        self
    }

    /// Append a JSON block with metadata.
    #[must_use]
    pub fn add_json_with(mut self, value: Value, extras: Extras) -> Self {
        self.blocks
            .push(ContentBlock::with_extras(BlockPayload::Json(value), extras));
        self
    }

    pub fn push(&mut self, block: ContentBlock) {
        self.blocks.push(block);
    }

    #[must_use]
    pub fn blocks(&self) -> &[ContentBlock] {
        &self.blocks
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Space-joined rendering of every block, in insertion order.
    #[must_use]
    pub fn display_text(&self) -> String {
        self.blocks
            .iter()
            .map(ContentBlock::display_text)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Self::text(text)
    }
}
