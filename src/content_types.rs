//! Request content types, represented the same way the filter syntax encodes
//! them: as a bitmask over a fixed enumeration.

use crate::rules::ResourceType;

bitflags! {
    /// Bitmask of the request types a filter applies to.
    ///
    /// The bit positions match the filter language's type map, so a mask
    /// parsed from `$image,script` here is numerically identical to the one
    /// the upstream filter grammar produces.
    pub struct ContentTypes: u32 {
        const OTHER = 1;
        const SCRIPT = 1 << 1;
        const IMAGE = 1 << 2;
        const STYLESHEET = 1 << 3;
        const OBJECT = 1 << 4;
        const SUBDOCUMENT = 1 << 5;
        const DOCUMENT = 1 << 6;
        const WEBSOCKET = 1 << 7;
        const WEBRTC = 1 << 8;
        const PING = 1 << 10;
        const XMLHTTPREQUEST = 1 << 11;
        const OBJECT_SUBREQUEST = 1 << 12;
        const MEDIA = 1 << 14;
        const FONT = 1 << 15;

        const POPUP = 0x1000_0000;
        const GENERICBLOCK = 0x2000_0000;
        const ELEMHIDE = 0x4000_0000;
        const GENERICHIDE = 0x8000_0000;

        /// Types requested over HTTP(S).
        const HTTP_REQUEST_TYPES = Self::IMAGE.bits |
            Self::STYLESHEET.bits |
            Self::SCRIPT.bits |
            Self::FONT.bits |
            Self::MEDIA.bits |
            Self::POPUP.bits |
            Self::OBJECT.bits |
            Self::OBJECT_SUBREQUEST.bits |
            Self::XMLHTTPREQUEST.bits |
            Self::PING.bits |
            Self::SUBDOCUMENT.bits |
            Self::OTHER.bits;

        /// Types the target format lumps together as "raw" loads.
        const RAW_REQUEST_TYPES = Self::XMLHTTPREQUEST.bits |
            Self::WEBSOCKET.bits |
            Self::WEBRTC.bits |
            Self::OBJECT_SUBREQUEST.bits |
            Self::PING.bits |
            Self::OTHER.bits;

        /// Types an exception filter can translate into an
        /// `ignore-previous-rules` rule for.
        const WHITELISTABLE_REQUEST_TYPES = Self::HTTP_REQUEST_TYPES.bits |
            Self::WEBSOCKET.bits |
            Self::WEBRTC.bits;

        /// Mask applied to filters that carry no type options at all.
        const DEFAULT_TYPES = Self::OTHER.bits |
            Self::SCRIPT.bits |
            Self::IMAGE.bits |
            Self::STYLESHEET.bits |
            Self::OBJECT.bits |
            Self::SUBDOCUMENT.bits |
            Self::WEBSOCKET.bits |
            Self::WEBRTC.bits |
            Self::PING.bits |
            Self::XMLHTTPREQUEST.bits |
            Self::OBJECT_SUBREQUEST.bits |
            Self::MEDIA.bits |
            Self::FONT.bits;

        const NONE = 0;
    }
}

impl ContentTypes {
    /// Looks up the type named by a filter option, e.g. `$image`.
    ///
    /// Returns `None` for options that are not content types.
    pub fn from_option(option: &str) -> Option<ContentTypes> {
        match option {
            "other" => Some(ContentTypes::OTHER),
            "script" => Some(ContentTypes::SCRIPT),
            "image" => Some(ContentTypes::IMAGE),
            "stylesheet" => Some(ContentTypes::STYLESHEET),
            "object" => Some(ContentTypes::OBJECT),
            "subdocument" => Some(ContentTypes::SUBDOCUMENT),
            "document" => Some(ContentTypes::DOCUMENT),
            "websocket" => Some(ContentTypes::WEBSOCKET),
            "webrtc" => Some(ContentTypes::WEBRTC),
            "ping" | "beacon" => Some(ContentTypes::PING),
            "xmlhttprequest" | "xhr" => Some(ContentTypes::XMLHTTPREQUEST),
            "object-subrequest" => Some(ContentTypes::OBJECT_SUBREQUEST),
            "media" => Some(ContentTypes::MEDIA),
            "font" => Some(ContentTypes::FONT),
            "popup" => Some(ContentTypes::POPUP),
            "genericblock" => Some(ContentTypes::GENERICBLOCK),
            "elemhide" => Some(ContentTypes::ELEMHIDE),
            "generichide" => Some(ContentTypes::GENERICHIDE),
            _ => None,
        }
    }

    /// Projects this mask onto the target format's resource type
    /// enumeration, in the order the target engine lists them.
    pub fn resource_types(self) -> Vec<ResourceType> {
        let mut types = Vec::new();

        if self.intersects(ContentTypes::IMAGE) {
            types.push(ResourceType::Image);
        }
        if self.intersects(ContentTypes::STYLESHEET) {
            types.push(ResourceType::StyleSheet);
        }
        if self.intersects(ContentTypes::SCRIPT) {
            types.push(ResourceType::Script);
        }
        if self.intersects(ContentTypes::FONT) {
            types.push(ResourceType::Font);
        }
        if self.intersects(ContentTypes::MEDIA | ContentTypes::OBJECT) {
            types.push(ResourceType::Media);
        }
        if self.intersects(ContentTypes::POPUP) {
            types.push(ResourceType::Popup);
        }
        if self.intersects(ContentTypes::RAW_REQUEST_TYPES) {
            types.push(ResourceType::Raw);
        }
        if self.intersects(ContentTypes::SUBDOCUMENT) {
            types.push(ResourceType::Document);
        }

        types
    }

    /// The minimal set of URL scheme prefix patterns needed to cover this
    /// mask. The first entry is the primary scheme handed to pattern
    /// lowering; any further entries become duplicated rules.
    pub fn url_schemes(self) -> Vec<&'static str> {
        // A filter covering WebSocket, WebRTC and at least one HTTP type
        // would otherwise need four rules; the wildcard scheme covers them
        // all in one. It also matches URLs whose scheme the lowering step
        // percent-encoded.
        if self.contains(ContentTypes::WEBSOCKET | ContentTypes::WEBRTC)
            && self.intersects(ContentTypes::HTTP_REQUEST_TYPES)
        {
            return vec![WILDCARD_SCHEME];
        }

        let mut schemes = Vec::new();

        if self.intersects(ContentTypes::WEBSOCKET) {
            schemes.push("wss?://");
        }
        if self.intersects(ContentTypes::WEBRTC) {
            schemes.push("stuns?:");
            schemes.push("turns?:");
        }
        if self.intersects(ContentTypes::HTTP_REQUEST_TYPES) {
            schemes.push(HTTP_SCHEME);
        }

        schemes
    }
}

impl Default for ContentTypes {
    fn default() -> ContentTypes {
        ContentTypes::DEFAULT_TYPES
    }
}

pub const WILDCARD_SCHEME: &str = "[^:]+:(//)?";
pub const HTTP_SCHEME: &str = "https?://";

#[cfg(test)]
#[path = "../tests/unit/content_types.rs"]
mod unit_tests;
