use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, fmt};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::ValidationError,
    permissions::{Capabilities, Permission, Role},
};

/// Layout fallback used for users without a saved page.
pub const DEFAULT_CARDS_PER_ROW: u8 = 3;

const DEFAULT_HERO_HEADING: &str = "Hero Heading";
const DEFAULT_HERO_SUBHEADING: &str = "Hero Subheading (Lorem ipsum dolor sit amet consectetur adipiscing elit sed do eiusmod tempor incididunt ut labore et dolore magna aliqua)";
const DEFAULT_CARD_TITLE: &str = "Card Title";
const DEFAULT_CARD_DESCRIPTION: &str = "Card description (Lorem ipsum dolor sit amet consectetur adipiscing elit sed do eiusmod tempor incididunt ut labore et dolore magna aliqua)";

// --- Page Schemas (Persisted as one JSON blob per user) ---

/// SectionId
///
/// Process-generated identity of a section. Stable for the section's lifetime and
/// used as the list key for reordering.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS, ToSchema,
)]
#[ts(export)]
pub struct SectionId(String);

impl SectionId {
    /// Generates a fresh v4-UUID backed identity.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SectionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for SectionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// SectionKind
///
/// The two palette entries. Mirrors the `type` discriminant of `Section`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum SectionKind {
    Hero,
    Card,
}

/// CallToAction
///
/// A (label, link) button pair rendered under a card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CallToAction {
    pub label: String,
    pub link: String,
}

impl CallToAction {
    pub fn new(label: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            link: link.into(),
        }
    }
}

/// Section
///
/// One visual block of a built page. The `type` discriminant is fixed at creation;
/// every consumer matches exhaustively on the variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(tag = "type", rename_all = "lowercase")]
#[ts(export)]
pub enum Section {
    Hero {
        id: SectionId,
        heading: String,
        subheading: String,
    },
    Card {
        id: SectionId,
        title: String,
        description: String,
        #[serde(rename = "primaryCta", default, skip_serializing_if = "Option::is_none")]
        primary_cta: Option<CallToAction>,
        #[serde(rename = "secondaryCta", default, skip_serializing_if = "Option::is_none")]
        secondary_cta: Option<CallToAction>,
    },
}

impl Section {
    /// Builds a section with the palette's default content.
    pub fn with_defaults(kind: SectionKind, id: SectionId) -> Self {
        match kind {
            SectionKind::Hero => Section::Hero {
                id,
                heading: DEFAULT_HERO_HEADING.to_string(),
                subheading: DEFAULT_HERO_SUBHEADING.to_string(),
            },
            SectionKind::Card => Section::Card {
                id,
                title: DEFAULT_CARD_TITLE.to_string(),
                description: DEFAULT_CARD_DESCRIPTION.to_string(),
                primary_cta: Some(CallToAction::new("Learn More", "#")),
                secondary_cta: Some(CallToAction::new("Get Started", "#")),
            },
        }
    }

    pub fn id(&self) -> &SectionId {
        match self {
            Section::Hero { id, .. } | Section::Card { id, .. } => id,
        }
    }

    pub fn kind(&self) -> SectionKind {
        match self {
            Section::Hero { .. } => SectionKind::Hero,
            Section::Card { .. } => SectionKind::Card,
        }
    }

    /// patched
    ///
    /// Returns a copy with the patch merged in. Fields belonging to the other variant
    /// are ignored, so the discriminant and identity never change.
    pub fn patched(&self, patch: &SectionPatch) -> Section {
        let mut next = self.clone();
        match &mut next {
            Section::Hero {
                heading,
                subheading,
                ..
            } => {
                merge(heading, &patch.heading);
                merge(subheading, &patch.subheading);
            }
            Section::Card {
                title,
                description,
                primary_cta,
                secondary_cta,
                ..
            } => {
                merge(title, &patch.title);
                merge(description, &patch.description);
                merge_cta(primary_cta, &patch.primary_label, &patch.primary_link);
                merge_cta(secondary_cta, &patch.secondary_label, &patch.secondary_link);
            }
        }
        next
    }
}

fn merge(field: &mut String, value: &Option<String>) {
    if let Some(value) = value {
        field.clone_from(value);
    }
}

fn merge_cta(cta: &mut Option<CallToAction>, label: &Option<String>, link: &Option<String>) {
    if label.is_none() && link.is_none() {
        return;
    }
    let cta = cta.get_or_insert_with(CallToAction::default);
    merge(&mut cta.label, label);
    merge(&mut cta.link, link);
}

/// SectionPatch
///
/// Field-level edit produced by the in-place editor. Only `Some` fields are merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SectionPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subheading: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary_link: Option<String>,
}

/// Layout
///
/// Page-wide layout setting. `cards_per_row` is expected in {1, 2, 3}; the grouping
/// engine renders anything else as a single column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Layout {
    pub cards_per_row: u8,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            cards_per_row: DEFAULT_CARDS_PER_ROW,
        }
    }
}

/// PageConfig
///
/// The persisted unit for one target user: ordered sections plus layout.
/// Stored wholesale; a save always replaces the previous blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct PageConfig {
    #[serde(default)]
    pub sections: Vec<Section>,
    #[serde(default)]
    pub layout: Layout,
}

impl PageConfig {
    /// validate
    ///
    /// Checks the invariants a saved page must hold: unique section identities and a
    /// positive cards-per-row value.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.layout.cards_per_row == 0 {
            return Err(ValidationError::InvalidCardsPerRow(self.layout.cards_per_row));
        }
        let mut seen = HashSet::with_capacity(self.sections.len());
        for section in &self.sections {
            if !seen.insert(section.id()) {
                return Err(ValidationError::DuplicateSectionId(section.id().clone()));
            }
        }
        Ok(())
    }
}

// --- Identity Schemas ---

/// User
///
/// A user record as resolved by the identity boundary. `role` drives every
/// permission check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// UserSummary
///
/// Entry of the target-user selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone().unwrap_or_default(),
        }
    }
}

/// UserProfile
///
/// Output schema for `GET /me`: identity plus the role-derived capability flags
/// the client uses to compose the builder view.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
    pub permissions: Vec<Permission>,
    pub capabilities: Capabilities,
}

// --- Page Responses ---

/// PageResponse
///
/// `config` is `null` when the target user has never saved a page.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PageResponse {
    pub user_id: Uuid,
    pub config: Option<PageConfig>,
}

/// RenderGroupView
///
/// Owned projection of a render group, sent to the view layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(tag = "kind", rename_all = "camelCase")]
#[ts(export)]
pub enum RenderGroupView {
    Hero { section: Section },
    Cards { columns: u8, sections: Vec<Section> },
}

/// RenderedPage
///
/// `is_empty` signals the "no sections yet" affordance; `groups` is then empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RenderedPage {
    pub is_empty: bool,
    pub groups: Vec<RenderGroupView>,
}
