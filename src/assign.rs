//! Pick the dimension group and map its values to Length, Width, Height

use crate::grain::GrainHint;
use crate::grouping::{Group, GroupSet};
use crate::metrics::MeasuredToken;
use crate::parser::NumberValue;
use serde::Serialize;

/// Length, Width and Height of one drawing; `None` when unknown
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Dimensions {
    pub length: Option<NumberValue>,
    pub width: Option<NumberValue>,
    pub height: Option<NumberValue>,
}

impl Dimensions {
    pub fn is_empty(&self) -> bool {
        self.length.is_none()
    }

    fn uniform(value: NumberValue) -> Self {
        Dimensions::of(value, value, value)
    }

    fn of(length: NumberValue, width: NumberValue, height: NumberValue) -> Self {
        Dimensions {
            length: Some(length),
            width: Some(width),
            height: Some(height),
        }
    }
}

/// The group of three or more members with the highest score
///
/// Ties go to the lowest group id.
pub fn select_winning_group(groups: &GroupSet) -> Option<&Group> {
    let mut best: Option<&Group> = None;
    for group in groups.groups.iter().filter(|g| g.len() >= 3) {
        match best {
            Some(b) if group.score < b.score || (group.score == b.score && group.id > b.id) => {}
            _ => best = Some(group),
        }
    }
    best
}

/// Occurrences of `value` in `raw`
fn count_of(raw: &[NumberValue], value: &NumberValue) -> usize {
    raw.iter().filter(|v| v.same_value(value)).count()
}

/// Assign dimensions from the raw member values
///
/// The values are deduplicated and sorted descending to decide the
/// cardinality case; repetition counts come from the raw list.
pub fn assign_dimensions(raw: &[NumberValue]) -> Dimensions {
    let mut values = raw.to_vec();
    values.sort_by(|a, b| b.cmp_value(a));
    values.dedup_by(|a, b| a.same_value(b));

    match values.as_slice() {
        [] => Dimensions::default(),
        [only] => Dimensions::uniform(*only),
        [larger, smaller] => {
            if count_of(raw, larger) >= 2 {
                Dimensions::of(*larger, *larger, *smaller)
            } else {
                Dimensions::of(*larger, *smaller, *smaller)
            }
        }
        [max, .., min] => {
            let n = values.len();
            let width = if n == 3 { values[1] } else { values[n - 2] };

            // Most repeated value other than the minimum; larger wins ties
            let repeated = values[..n - 1]
                .iter()
                .map(|v| (*v, count_of(raw, v)))
                .filter(|(_, count)| *count >= 2)
                .max_by(|(a, ca), (b, cb)| ca.cmp(cb).then(a.cmp_value(b)));

            match repeated {
                Some((value, _)) if value.same_value(max) => Dimensions::of(value, value, *min),
                Some((value, _)) => Dimensions::of(*max, value, value),
                None => Dimensions::of(*max, width, *min),
            }
        }
    }
}

/// Swap Length and Width when the grain marker runs along the width
///
/// The grain axis names the length direction: if the largest value printed
/// along that axis is the current width (and not the length), the two trade
/// places.
pub fn apply_grain_hint(
    dimensions: Dimensions,
    hint: &GrainHint,
    tokens: &[&MeasuredToken],
) -> Dimensions {
    let along_grain = tokens
        .iter()
        .filter(|t| t.token.orientation.axis() == Some(hint.axis))
        .map(|t| t.token.value)
        .max_by(|a, b| a.cmp_value(b));

    let (Some(grain_value), Some(length), Some(width)) =
        (along_grain, dimensions.length, dimensions.width)
    else {
        return dimensions;
    };

    if grain_value.same_value(&width) && !grain_value.same_value(&length) {
        log::debug!("grain marker runs along {}: swapping length and width", width);
        Dimensions {
            length: Some(width),
            width: Some(length),
            height: dimensions.height,
        }
    } else {
        dimensions
    }
}
