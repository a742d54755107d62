//! Cluster tokens that share a font/metric signature and score the clusters
//!
//! Tokens live in one arena (`&[MeasuredToken]`); groups refer to them by
//! index. Each token belongs to at most one group. The grouping pass creates
//! groups from seeds, two expansion passes try to lift two-member groups to
//! three, and the remaining groups are scored.

use crate::config::AnalysisConfig;
use crate::metrics::MeasuredToken;
use crate::tokens::{Axis, Orientation};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

/// Index of a token in the measured-token arena
pub type TokenId = usize;

/// Which similarity rule joined two tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MatchRule {
    /// Same font size, char width, char height and font
    ExactSignature,
    /// Same font, char width and font size; char height within tolerance
    NearHeight,
    /// As `NearHeight`, between a one-glyph token and an oriented one
    SingleBridge,
    /// Horizontal/vertical pair whose vertical side was set in the rotated frame
    RotatedPair,
}

/// Label shown for a token in the token table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupLabel {
    Group(usize),
    Ungrouped,
    InsufficientData,
    Error,
}

impl fmt::Display for GroupLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupLabel::Group(id) => write!(f, "GROUP_{}", id),
            GroupLabel::Ungrouped => write!(f, "UNGROUPED"),
            GroupLabel::InsufficientData => write!(f, "INSUFFICIENT_DATA"),
            GroupLabel::Error => write!(f, "ERROR"),
        }
    }
}

/// A finalized, scored group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Group {
    /// 1-based id in creation order
    pub id: usize,
    pub members: Vec<TokenId>,
    pub has_orientation_mix: bool,
    pub score: i32,
}

impl Group {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn label(&self) -> GroupLabel {
        GroupLabel::Group(self.id)
    }
}

/// Result of the grouping pass for one page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupSet {
    /// Groups of two or more members, ordered by id
    pub groups: Vec<Group>,
    /// Group id per token, `None` when ungrouped
    pub assignment: Vec<Option<usize>>,
}

impl GroupSet {
    pub fn get(&self, id: usize) -> Option<&Group> {
        self.groups.iter().find(|g| g.id == id)
    }

    pub fn group_of(&self, token: TokenId) -> Option<&Group> {
        self.assignment
            .get(token)
            .copied()
            .flatten()
            .and_then(|id| self.get(id))
    }

    pub fn label_of(&self, token: TokenId) -> GroupLabel {
        self.group_of(token)
            .map(Group::label)
            .unwrap_or(GroupLabel::Ungrouped)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GroupingError {
    #[error("token {index} has a non-finite metric")]
    NonFiniteMetric { index: TokenId },
    #[error("group {group} references missing token {index}")]
    DanglingToken { group: usize, index: TokenId },
}

fn same(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

fn within(a: f64, b: f64, tolerance: f64) -> bool {
    (a - b).abs() <= tolerance + 1e-9
}

/// Similarity between two tokens, rules tried in priority order
pub fn match_rule(
    a: &MeasuredToken,
    b: &MeasuredToken,
    config: &AnalysisConfig,
) -> Option<MatchRule> {
    let (ma, mb) = (&a.metrics, &b.metrics);
    let same_font = a.token.font_name == b.token.font_name;
    let same_width = same(ma.char_width, mb.char_width);
    let same_size = same(ma.font_size, mb.font_size);
    let height_close = within(ma.char_height, mb.char_height, config.char_height_tolerance);

    if same_font && same_size && same_width && same(ma.char_height, mb.char_height) {
        return Some(MatchRule::ExactSignature);
    }

    let (oa, ob) = (a.token.orientation, b.token.orientation);

    if same_font && same_width && same_size && height_close {
        let bridges_single = matches!(
            (oa, ob),
            (Orientation::Single, Orientation::Horizontal | Orientation::Vertical)
                | (Orientation::Horizontal | Orientation::Vertical, Orientation::Single)
        );
        return Some(if bridges_single {
            MatchRule::SingleBridge
        } else {
            MatchRule::NearHeight
        });
    }

    if same_font && same_width && height_close {
        let vertical = match (oa, ob) {
            (Orientation::Horizontal, Orientation::Vertical) => Some(mb),
            (Orientation::Vertical, Orientation::Horizontal) => Some(ma),
            _ => None,
        };
        if let Some(v) = vertical {
            if same(v.font_size, v.char_width) {
                return Some(MatchRule::RotatedPair);
            }
        }
    }

    None
}

/// Score a group of tokens
///
/// 30 for exactly three members, 10 for five; +10 when the char-spacing
/// spread is below the threshold; +20 for a mixed-orientation group.
pub fn score_group(members: &[&MeasuredToken], has_orientation_mix: bool, config: &AnalysisConfig) -> i32 {
    let mut score = match members.len() {
        3 => 30,
        5 => 10,
        _ => 0,
    };

    if members.len() > 1 {
        let (min, max) = members
            .iter()
            .map(|m| m.metrics.char_spacing)
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
        if max - min < config.spacing_spread_threshold {
            score += 10;
        }
    }

    if has_orientation_mix {
        score += 20;
    }

    score
}

/// Mixed orientation only counts when the metric signature is not uniform
pub fn has_orientation_mix(members: &[&MeasuredToken]) -> bool {
    let Some(first) = members.first() else {
        return false;
    };
    let uniform = members.iter().all(|m| {
        same(m.metrics.font_size, first.metrics.font_size)
            && same(m.metrics.char_width, first.metrics.char_width)
            && same(m.metrics.char_height, first.metrics.char_height)
    });
    let orientations: HashSet<Orientation> = members.iter().map(|m| m.token.orientation).collect();

    !uniform && orientations.len() > 1
}

/// Mutable working state of one grouping run
struct Workspace<'a> {
    tokens: &'a [MeasuredToken],
    /// Members per group, indexed by `id - 1`; dissolved groups are empty
    groups: Vec<Vec<TokenId>>,
    assignment: Vec<Option<usize>>,
    config: &'a AnalysisConfig,
}

impl<'a> Workspace<'a> {
    fn new(tokens: &'a [MeasuredToken], config: &'a AnalysisConfig) -> Self {
        Self {
            tokens,
            groups: Vec::new(),
            assignment: vec![None; tokens.len()],
            config,
        }
    }

    fn seed_groups(&mut self) {
        for i in 0..self.tokens.len() {
            if self.assignment[i].is_some() {
                continue;
            }
            let mut members = vec![i];
            for j in 0..self.tokens.len() {
                if i == j || self.assignment[j].is_some() {
                    continue;
                }
                if let Some(rule) = match_rule(&self.tokens[i], &self.tokens[j], self.config) {
                    log::trace!("token {} joins seed {} via {:?}", j, i, rule);
                    members.push(j);
                }
            }

            if members.len() > 1 {
                let id = self.groups.len() + 1;
                for &m in &members {
                    self.assignment[m] = Some(id);
                }
                self.groups.push(members);
            }
        }
    }

    /// Try to move one token into every two-member group
    ///
    /// `strict` additionally requires the donor to be set in the rotated
    /// frame (font size equal to char width) and to add an orientation the
    /// group does not have yet; a one-glyph donor always qualifies.
    /// Donors may come from any other group. Only groups that were pairs
    /// when the pass started are expanded, so a group that shrinks to a
    /// pair by donating is not refilled from its receiver.
    fn expand_pairs(&mut self, strict: bool) {
        let tokens = self.tokens;
        let pairs: Vec<usize> = (0..self.groups.len())
            .filter(|&index| self.groups[index].len() == 2)
            .collect();
        for index in pairs {
            if self.groups[index].len() != 2 {
                continue;
            }
            let id = index + 1;
            let members: Vec<&MeasuredToken> =
                self.groups[index].iter().map(|&m| &tokens[m]).collect();

            let font = &members[0].token.font_name;
            let width = members[0].metrics.char_width;
            if members.iter().any(|m| &m.token.font_name != font || !same(m.metrics.char_width, width)) {
                continue;
            }
            let heights: Vec<f64> = members.iter().map(|m| m.metrics.char_height).collect();
            let axes: HashSet<Axis> = members.iter().filter_map(|m| m.token.orientation.axis()).collect();

            let donor = (0..tokens.len()).find(|&t| {
                let current = self.assignment[t];
                if current == Some(id) {
                    return false;
                }

                let candidate = &tokens[t];
                let m = &candidate.metrics;
                let fits = &candidate.token.font_name == font
                    && same(m.char_width, width)
                    && heights
                        .iter()
                        .any(|h| within(m.char_height, *h, self.config.char_height_tolerance));
                if !fits {
                    return false;
                }
                if !strict {
                    return true;
                }

                let rotated_frame = same(m.font_size, m.char_width);
                let new_axis = match candidate.token.orientation.axis() {
                    None => true,
                    Some(axis) => !axes.contains(&axis),
                };
                rotated_frame && new_axis
            });

            if let Some(t) = donor {
                self.move_token(t, id);
            }
        }
    }

    fn move_token(&mut self, token: TokenId, id: usize) {
        if let Some(old) = self.assignment[token] {
            let donor = &mut self.groups[old - 1];
            donor.retain(|&m| m != token);
            if donor.len() == 1 {
                let leftover = donor[0];
                donor.clear();
                self.assignment[leftover] = None;
                log::debug!("GROUP_{} dissolved after donating token {}", old, token);
            }
        }
        log::debug!("token {} moved into GROUP_{}", token, id);
        self.groups[id - 1].push(token);
        self.assignment[token] = Some(id);
    }

    fn finish(self) -> Result<GroupSet, GroupingError> {
        let mut groups = Vec::new();
        for (index, members) in self.groups.into_iter().enumerate() {
            if members.len() < 2 {
                continue;
            }
            let id = index + 1;
            if let Some(&missing) = members.iter().find(|&&m| m >= self.tokens.len()) {
                return Err(GroupingError::DanglingToken { group: id, index: missing });
            }

            let refs: Vec<&MeasuredToken> = members.iter().map(|&m| &self.tokens[m]).collect();
            let mix = has_orientation_mix(&refs);
            let score = score_group(&refs, mix, self.config);
            groups.push(Group {
                id,
                members,
                has_orientation_mix: mix,
                score,
            });
        }

        Ok(GroupSet {
            groups,
            assignment: self.assignment,
        })
    }
}

/// Partition tokens into scored groups
pub fn build_groups(tokens: &[MeasuredToken], config: &AnalysisConfig) -> Result<GroupSet, GroupingError> {
    if let Some(index) = tokens.iter().position(|t| !t.metrics.is_finite()) {
        return Err(GroupingError::NonFiniteMetric { index });
    }

    let mut workspace = Workspace::new(tokens, config);
    workspace.seed_groups();
    workspace.expand_pairs(true);
    workspace.expand_pairs(false);
    let set = workspace.finish()?;

    log::debug!(
        "{} groups from {} tokens: {}",
        set.groups.len(),
        tokens.len(),
        set.groups
            .iter()
            .map(|g| format!("GROUP_{}(n={}, score={})", g.id, g.len(), g.score))
            .collect::<Vec<_>>()
            .join(", ")
    );
    Ok(set)
}
