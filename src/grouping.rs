//! Ordering/grouping engine.
//!
//! Turns the ordered section sequence into render groups: every hero renders
//! full-width on its own, and each maximal run of consecutive cards becomes one
//! grid. The pass is linear and pure; callers recompute it on every change.

use crate::models::{RenderGroupView, RenderedPage, Section};

/// GridColumns
///
/// Column count of a card grid. Unsupported cards-per-row values fall back to a
/// single column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridColumns {
    One,
    Two,
    Three,
}

impl GridColumns {
    pub fn from_cards_per_row(cards_per_row: u8) -> Self {
        match cards_per_row {
            2 => GridColumns::Two,
            3 => GridColumns::Three,
            _ => GridColumns::One,
        }
    }

    pub fn count(&self) -> u8 {
        match self {
            GridColumns::One => 1,
            GridColumns::Two => 2,
            GridColumns::Three => 3,
        }
    }
}

/// RenderGroup
///
/// A derived visual batch borrowing from the section sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderGroup<'a> {
    Hero(&'a Section),
    Cards {
        columns: GridColumns,
        sections: Vec<&'a Section>,
    },
}

impl<'a> RenderGroup<'a> {
    pub fn members(&self) -> &[&'a Section] {
        match self {
            RenderGroup::Hero(section) => std::slice::from_ref(section),
            RenderGroup::Cards { sections, .. } => sections,
        }
    }
}

/// RenderPlan
///
/// `Empty` is the "no sections yet" affordance, distinct from an empty group list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderPlan<'a> {
    Empty,
    Groups(Vec<RenderGroup<'a>>),
}

impl<'a> RenderPlan<'a> {
    pub fn is_empty(&self) -> bool {
        matches!(self, RenderPlan::Empty)
    }

    pub fn groups(&self) -> &[RenderGroup<'a>] {
        match self {
            RenderPlan::Empty => &[],
            RenderPlan::Groups(groups) => groups,
        }
    }

    /// Concatenates the members of every group in emission order.
    pub fn sections(&self) -> Vec<&'a Section> {
        self.groups()
            .iter()
            .flat_map(|group| group.members().iter().copied())
            .collect()
    }
}

/// group_sections
///
/// Scans `sections` once, accumulating a pending card run that is flushed whenever
/// a hero appears and at the end of the sequence.
pub fn group_sections(sections: &[Section], cards_per_row: u8) -> RenderPlan<'_> {
    if sections.is_empty() {
        return RenderPlan::Empty;
    }

    let columns = GridColumns::from_cards_per_row(cards_per_row);
    let mut groups = Vec::new();
    let mut pending: Vec<&Section> = Vec::new();

    for section in sections {
        match section {
            Section::Hero { .. } => {
                if !pending.is_empty() {
                    groups.push(RenderGroup::Cards {
                        columns,
                        sections: std::mem::take(&mut pending),
                    });
                }
                groups.push(RenderGroup::Hero(section));
            }
            Section::Card { .. } => pending.push(section),
        }
    }

    if !pending.is_empty() {
        groups.push(RenderGroup::Cards {
            columns,
            sections: pending,
        });
    }

    RenderPlan::Groups(groups)
}

impl From<&RenderPlan<'_>> for RenderedPage {
    fn from(plan: &RenderPlan<'_>) -> Self {
        let groups = plan
            .groups()
            .iter()
            .map(|group| match group {
                RenderGroup::Hero(section) => RenderGroupView::Hero {
                    section: (*section).clone(),
                },
                RenderGroup::Cards { columns, sections } => RenderGroupView::Cards {
                    columns: columns.count(),
                    sections: sections.iter().map(|s| (*s).clone()).collect(),
                },
            })
            .collect();

        RenderedPage {
            is_empty: plan.is_empty(),
            groups,
        }
    }
}
