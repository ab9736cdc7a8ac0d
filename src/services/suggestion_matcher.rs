//! Day-of-month matching for recurring expense suggestions.
//!
//! A suggestion applies on `day` when it is active and `day` lies inside
//! `[start_day, end_day]`. A range with `start_day > end_day` wraps past the end of the
//! month, so `28..=5` covers 28, 29, 30, 31, 1, 2, 3, 4 and 5. `start_day == end_day` is a
//! single day.
//!
//! The same predicate exists twice: [`matches_day`] for in-process filtering and
//! [`DayCondition`] for pushing the filter down to the store. Both must agree for every
//! input.

use crate::models::suggestion::{DayOfMonth, RecurringExpenseSuggestion};

/// Whether `suggestion` applies on `day`
pub fn matches_day(suggestion: &RecurringExpenseSuggestion, day: DayOfMonth) -> bool {
    if !suggestion.is_active {
        return false;
    }

    let (start, end) = (suggestion.start_day, suggestion.end_day);
    if start <= end {
        start <= day && day <= end
    } else {
        day >= start || day <= end
    }
}

/// Keeps the suggestions that apply on `day`, in their input order
pub fn filter_suggestions_for_day(
    suggestions: &[RecurringExpenseSuggestion],
    day: DayOfMonth,
) -> Vec<RecurringExpenseSuggestion> {
    suggestions
        .iter()
        .filter(|suggestion| matches_day(suggestion, day))
        .cloned()
        .collect()
}

/// Day column of a stored suggestion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayColumn {
    StartDay,
    EndDay,
}

impl DayColumn {
    fn column_name(self) -> &'static str {
        match self {
            DayColumn::StartDay => "start_day",
            DayColumn::EndDay => "end_day",
        }
    }
}

/// Operand of a day comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayOperand {
    Column(DayColumn),
    /// The queried day
    Day,
}

impl DayOperand {
    fn resolve(self, suggestion: &RecurringExpenseSuggestion, day: DayOfMonth) -> DayOfMonth {
        match self {
            DayOperand::Column(DayColumn::StartDay) => suggestion.start_day,
            DayOperand::Column(DayColumn::EndDay) => suggestion.end_day,
            DayOperand::Day => day,
        }
    }

    fn to_sql(self, day_placeholder: &str) -> String {
        match self {
            DayOperand::Column(column) => column.column_name().to_string(),
            DayOperand::Day => day_placeholder.to_string(),
        }
    }
}

/// Store-side filter expression over `is_active`, `start_day` and `end_day`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DayCondition {
    IsActive,
    LessOrEqual(DayOperand, DayOperand),
    GreaterThan(DayOperand, DayOperand),
    And(Box<DayCondition>, Box<DayCondition>),
    Or(Box<DayCondition>, Box<DayCondition>),
}

impl DayCondition {
    fn and(self, other: DayCondition) -> DayCondition {
        DayCondition::And(Box::new(self), Box::new(other))
    }

    fn or(self, other: DayCondition) -> DayCondition {
        DayCondition::Or(Box::new(self), Box::new(other))
    }

    /// The matching predicate of [`matches_day`], as an expression tree
    pub fn matching_day() -> DayCondition {
        use DayColumn::{EndDay, StartDay};
        use DayOperand::{Column, Day};

        let within =
            DayCondition::LessOrEqual(Column(StartDay), Day).and(DayCondition::LessOrEqual(Day, Column(EndDay)));
        let plain_range = DayCondition::LessOrEqual(Column(StartDay), Column(EndDay)).and(within);

        let after_start = DayCondition::LessOrEqual(Column(StartDay), Day);
        let before_end = DayCondition::LessOrEqual(Day, Column(EndDay));
        let wrapping_range =
            DayCondition::GreaterThan(Column(StartDay), Column(EndDay)).and(after_start.or(before_end));

        DayCondition::IsActive.and(plain_range.or(wrapping_range))
    }

    /// Evaluates the expression in process
    pub fn evaluate(&self, suggestion: &RecurringExpenseSuggestion, day: DayOfMonth) -> bool {
        match self {
            DayCondition::IsActive => suggestion.is_active,
            DayCondition::LessOrEqual(left, right) => {
                left.resolve(suggestion, day) <= right.resolve(suggestion, day)
            }
            DayCondition::GreaterThan(left, right) => {
                left.resolve(suggestion, day) > right.resolve(suggestion, day)
            }
            DayCondition::And(left, right) => {
                left.evaluate(suggestion, day) && right.evaluate(suggestion, day)
            }
            DayCondition::Or(left, right) => {
                left.evaluate(suggestion, day) || right.evaluate(suggestion, day)
            }
        }
    }

    /// Renders the expression as a SQL boolean expression. `day_placeholder` is the bind
    /// parameter holding the queried day, e.g. `$2`.
    pub fn to_sql(&self, day_placeholder: &str) -> String {
        match self {
            DayCondition::IsActive => "is_active".to_string(),
            DayCondition::LessOrEqual(left, right) => format!(
                "{} <= {}",
                left.to_sql(day_placeholder),
                right.to_sql(day_placeholder)
            ),
            DayCondition::GreaterThan(left, right) => format!(
                "{} > {}",
                left.to_sql(day_placeholder),
                right.to_sql(day_placeholder)
            ),
            DayCondition::And(left, right) => format!(
                "({} AND {})",
                left.to_sql(day_placeholder),
                right.to_sql(day_placeholder)
            ),
            DayCondition::Or(left, right) => format!(
                "({} OR {})",
                left.to_sql(day_placeholder),
                right.to_sql(day_placeholder)
            ),
        }
    }
}
