//! Typed box descriptors.
//!
//! Markers are parsed once, when an attribute arrives through the mirror
//! protocol, so traversals never re-read attribute strings.

use anyhow::{Error, anyhow, bail};
use log::warn;

/// Role of a grid section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionRole {
    /// `thead`: pinned above the body.
    Header,
    /// `tbody`: the vertically scrolling part.
    Body,
    /// `tfoot`: pinned below the body.
    Footer,
}

impl SectionRole {
    /// Sections in rendering order.
    pub const ALL: [Self; 3] = [Self::Header, Self::Body, Self::Footer];

    /// Tag name used when the engine creates a section of this role.
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Header => "thead",
            Self::Body => "tbody",
            Self::Footer => "tfoot",
        }
    }
}

/// Structural kind of a box, derived from its tag name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoxKind {
    /// The document root.
    Document,
    /// Table-like grid.
    Grid,
    /// Grid section (header/body/footer).
    Section(SectionRole),
    /// Grid row.
    Row,
    /// Grid cell.
    Cell,
    /// Generic block container.
    Container,
    /// Embedded frame; scroll regions default to full width.
    Frame,
    /// Non-rendering node; traversal never descends into it.
    Script,
    /// Text run.
    Text,
    /// Anything else.
    Other,
}

impl BoxKind {
    /// Classify an element by tag name (case-insensitive).
    pub fn from_tag(tag: &str) -> Self {
        match tag.to_ascii_lowercase().as_str() {
            "table" => Self::Grid,
            "thead" => Self::Section(SectionRole::Header),
            "tbody" => Self::Section(SectionRole::Body),
            "tfoot" => Self::Section(SectionRole::Footer),
            "tr" => Self::Row,
            "td" | "th" => Self::Cell,
            "iframe" | "frame" => Self::Frame,
            "script" | "style" | "template" | "noscript" => Self::Script,
            "div" | "body" | "main" | "section" | "article" | "aside" | "nav" | "header"
            | "footer" | "form" | "ul" | "ol" | "li" | "p" => Self::Container,
            _ => Self::Other,
        }
    }

    /// Whether boxes of this kind produce rendered output.
    pub const fn is_rendered(self) -> bool {
        !matches!(self, Self::Script)
    }
}

/// A percentage in `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Percent(u8);

impl Percent {
    /// 0%: the dimension is not managed.
    pub const ZERO: Self = Self(0);
    /// 100% of the remaining viewport.
    pub const FULL: Self = Self(100);

    /// Build a percentage, rejecting values above 100.
    pub const fn new(value: u8) -> Option<Self> {
        if value <= 100 { Some(Self(value)) } else { None }
    }

    /// Raw value.
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Whether this percentage leaves the dimension unmanaged.
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Parse an attribute value such as `"50"` or `"50%"`.
    ///
    /// # Errors
    ///
    /// Returns an error when the value is not an integer in `0..=100`.
    pub fn parse(raw: &str) -> Result<Self, Error> {
        let trimmed = raw.trim();
        let digits = trimmed.strip_suffix('%').unwrap_or(trimmed).trim();
        let value: u32 = digits
            .parse()
            .map_err(|err| anyhow!("invalid percentage {raw:?}: {err}"))?;
        u8::try_from(value)
            .ok()
            .and_then(Self::new)
            .ok_or_else(|| anyhow!("percentage {value} is outside 0..=100"))
    }
}

/// Which scrollbars a scroll region shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ScrollAxis {
    /// Standard vertical scrollbar.
    #[default]
    Vertical,
    /// Both axes, laid out as a non-wrapping flex row (horizontally paged regions).
    Both,
}

/// Raw scroll markers as ingested; use [`ScrollMarkers::region`] to read them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScrollMarkers {
    /// Axis from the `scrollable` attribute, if present.
    pub attribute: Option<ScrollAxis>,
    /// Whether the `scrollable` class is present.
    pub class: bool,
    /// `ubScrollHeight`.
    pub height: Option<Percent>,
    /// `ubScrollWidth`.
    pub width: Option<Percent>,
}

impl ScrollMarkers {
    /// Whether the box is a scroll region at all.
    pub const fn is_marked(&self) -> bool {
        self.attribute.is_some() || self.class
    }

    /// Effective scroll region for a box of `kind`, with defaults applied.
    ///
    /// Percentages are only honoured on marked boxes. Height defaults to 100%,
    /// width to 100% for frames and 0% (unmanaged) otherwise.
    pub fn region(&self, kind: BoxKind) -> Option<ScrollRegion> {
        if !self.is_marked() {
            return None;
        }
        let default_width = if kind == BoxKind::Frame {
            Percent::FULL
        } else {
            Percent::ZERO
        };
        Some(ScrollRegion {
            height: self.height.unwrap_or(Percent::FULL),
            width: self.width.unwrap_or(default_width),
            axis: self.attribute.unwrap_or_default(),
        })
    }
}

/// Effective sizing instructions for a scroll-marked box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollRegion {
    /// Share of the viewport height remaining below the box.
    pub height: Percent,
    /// Share of the viewport width remaining right of the box.
    pub width: Percent,
    /// Scrollbar mode.
    pub axis: ScrollAxis,
}

/// Stored open/hidden state of a collapsible row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CollapseState {
    /// Subordinate rows are shown.
    #[default]
    Open,
    /// Subordinate rows are hidden.
    Hidden,
}

impl CollapseState {
    /// The opposite state.
    pub const fn flipped(self) -> Self {
        match self {
            Self::Open => Self::Hidden,
            Self::Hidden => Self::Open,
        }
    }

    /// Attribute value as written back to the host.
    pub const fn as_attr(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Hidden => "hide",
        }
    }

    /// Control glyph shown for this state: collapse when open, expand when hidden.
    pub const fn glyph(self) -> &'static str {
        match self {
            Self::Open => "-",
            Self::Hidden => "+",
        }
    }
}

/// Sibling direction in which a row's subordinate rows extend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CollapseDirection {
    /// Subordinate rows follow the row.
    #[default]
    Forward,
    /// Subordinate rows precede the row.
    Backward,
}

/// Collapse attributes of a leveled row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollapseMarker {
    /// Nesting depth.
    pub level: u32,
    /// Stored state.
    pub state: CollapseState,
    /// Direction of subordinate rows.
    pub direction: CollapseDirection,
}

/// Identity shared by all boxes of one split group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SplitGroupId(pub u32);

/// Part a box plays inside a split group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SplitRole {
    /// Outer frame carrying the scroll markers.
    Frame,
    /// The original grid, hidden, used as row reservoir.
    Source,
    /// Scroll wrapper around one auxiliary grid.
    Wrapper(SectionRole),
    /// Auxiliary single-section grid.
    Auxiliary(SectionRole),
    /// Hidden row forcing the auxiliary grid's column widths.
    SyncRow,
}

/// Split group membership of a box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SplitMembership {
    /// Group identity.
    pub group: SplitGroupId,
    /// Role inside the group.
    pub role: SplitRole,
}

/// Typed markers of a box.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoxDescriptor {
    /// `id` attribute; at most one box owns a given id after relocation.
    pub id: Option<String>,
    /// Scroll markers.
    pub scroll: ScrollMarkers,
    /// `collapseLevel`; rows without it are plain continuation rows.
    pub collapse_level: Option<u32>,
    /// `collapseState`.
    pub collapse_state: CollapseState,
    /// `collapseDirection`.
    pub collapse_direction: CollapseDirection,
    /// `rowspan` (cells), at least 1.
    pub rowspan: u32,
    /// `colspan` (cells), at least 1.
    pub colspan: u32,
    /// `ubReverse` (grids): body rows are reversed at initialisation.
    pub reverse: bool,
    /// Cell belongs to the injected collapse control column (`collapseCell`).
    pub collapse_control: bool,
    /// Runtime split group membership.
    pub split: Option<SplitMembership>,
}

impl BoxDescriptor {
    /// Descriptor with no markers.
    pub fn new() -> Self {
        Self {
            rowspan: 1,
            colspan: 1,
            ..Self::default()
        }
    }

    /// Collapse marker, if the row is leveled.
    pub fn collapse(&self) -> Option<CollapseMarker> {
        self.collapse_level.map(|level| CollapseMarker {
            level,
            state: self.collapse_state,
            direction: self.collapse_direction,
        })
    }

    /// Ingest one attribute, returning whether it was a recognised marker.
    ///
    /// # Errors
    ///
    /// Returns an error when a marker attribute carries a malformed value.
    pub fn apply_attr(&mut self, name: &str, value: &str) -> Result<bool, Error> {
        match name.to_ascii_lowercase().as_str() {
            "id" => {
                self.id = (!value.is_empty()).then(|| value.to_owned());
            }
            "scrollable" => {
                self.scroll.attribute = Some(if value.trim().is_empty() {
                    ScrollAxis::Vertical
                } else {
                    ScrollAxis::Both
                });
            }
            "class" => {
                self.scroll.class = value.split_whitespace().any(|token| token == "scrollable");
                // Class lists carry presentation too; not a marker on its own.
                return Ok(false);
            }
            "ubscrollheight" => self.scroll.height = Some(Percent::parse(value)?),
            "ubscrollwidth" => self.scroll.width = Some(Percent::parse(value)?),
            "collapselevel" => {
                let level = value
                    .trim()
                    .parse::<u32>()
                    .map_err(|err| anyhow!("invalid collapseLevel {value:?}: {err}"))?;
                self.collapse_level = Some(level);
            }
            "collapsestate" => {
                self.collapse_state = match value.trim().to_ascii_lowercase().as_str() {
                    "open" => CollapseState::Open,
                    "hide" | "hidden" => CollapseState::Hidden,
                    other => bail!("invalid collapseState {other:?}"),
                };
            }
            "collapsedirection" => {
                self.collapse_direction = match value.trim().to_ascii_lowercase().as_str() {
                    "after" | "forward" => CollapseDirection::Forward,
                    "before" | "backward" => CollapseDirection::Backward,
                    other => bail!("invalid collapseDirection {other:?}"),
                };
            }
            "rowspan" => self.rowspan = parse_span(name, value, MAX_ROWSPAN)?,
            "colspan" => self.colspan = parse_span(name, value, MAX_COLSPAN)?,
            "ubreverse" => self.reverse = true,
            "collapsecell" => self.collapse_control = true,
            _ => return Ok(false),
        }
        Ok(true)
    }

    /// Forget a marker attribute that the host removed.
    pub fn clear_attr(&mut self, name: &str) {
        match name.to_ascii_lowercase().as_str() {
            "id" => self.id = None,
            "scrollable" => self.scroll.attribute = None,
            "class" => self.scroll.class = false,
            "ubscrollheight" => self.scroll.height = None,
            "ubscrollwidth" => self.scroll.width = None,
            "collapselevel" => self.collapse_level = None,
            "collapsestate" => self.collapse_state = CollapseState::default(),
            "collapsedirection" => self.collapse_direction = CollapseDirection::default(),
            "rowspan" => self.rowspan = 1,
            "colspan" => self.colspan = 1,
            "ubreverse" => self.reverse = false,
            "collapsecell" => self.collapse_control = false,
            _ => {}
        }
    }
}

/// Largest `colspan` honoured, as HTML clamps it.
pub const MAX_COLSPAN: u32 = 1000;
/// Largest `rowspan` honoured, as HTML clamps it.
pub const MAX_ROWSPAN: u32 = 65534;

/// Parse a row/column span. Zero is treated as one, like HTML does for `colspan`,
/// and values past `limit` are clamped to it.
fn parse_span(name: &str, value: &str, limit: u32) -> Result<u32, Error> {
    let span = value
        .trim()
        .parse::<u32>()
        .map_err(|err| anyhow!("invalid {name} {value:?}: {err}"))?;
    if span > limit {
        warn!("Clamping {name} {span} to {limit}");
    }
    Ok(span.clamp(1, limit))
}
