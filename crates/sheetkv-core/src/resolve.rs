//! Cell display text

use crate::cell::{CellAddress, CellFact, CellKind};
use crate::error::Result;
use crate::number_format::{DateSystem, NumberFormatter};
use crate::source::{CellFactSource, SheetId};

/// Display text and formula of one cell
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedValue {
    /// What a spreadsheet would show in the cell
    pub display: String,
    /// Formula text without the leading `=`, empty for literals
    pub formula: String,
}

/// Turns cell facts into display text
#[derive(Debug, Clone, Default)]
pub struct ValueResolver {
    formatter: NumberFormatter,
}

impl ValueResolver {
    pub fn new(formatter: NumberFormatter) -> Self {
        Self { formatter }
    }

    pub fn formatter(&self) -> &NumberFormatter {
        &self.formatter
    }

    /// Resolve display text and formula of the cell at `address`
    pub fn resolve<S>(&self, source: &S, sheet: SheetId, address: CellAddress) -> Result<ResolvedValue>
    where
        S: CellFactSource + ?Sized,
    {
        let fact = source.cell_fact(sheet, address)?;
        let formatter = self.formatter_for(source);

        if fact.kind == CellKind::Formula {
            let formula = fact.formula_text.clone().unwrap_or_default();
            let display = match fact.cached_result() {
                Some(cached) => display_of(source, &formatter, &cached)?,
                None => String::new(),
            };
            return Ok(ResolvedValue { display, formula });
        }

        Ok(ResolvedValue {
            display: display_of(source, &formatter, &fact)?,
            formula: String::new(),
        })
    }

    /// Resolve only the display text
    pub fn resolve_display<S>(&self, source: &S, sheet: SheetId, address: CellAddress) -> Result<String>
    where
        S: CellFactSource + ?Sized,
    {
        Ok(self.resolve(source, sheet, address)?.display)
    }

    fn formatter_for<S: CellFactSource + ?Sized>(&self, source: &S) -> NumberFormatter {
        if source.uses_1904_dates() {
            self.formatter.clone().with_date_system(DateSystem::Excel1904)
        } else {
            self.formatter.clone()
        }
    }
}

fn display_of<S>(source: &S, formatter: &NumberFormatter, fact: &CellFact) -> Result<String>
where
    S: CellFactSource + ?Sized,
{
    let text = match fact.kind {
        CellKind::Empty | CellKind::Text => fact.raw_value.clone(),
        CellKind::SharedStringRef => match fact.raw_value.trim().parse::<usize>() {
            Ok(index) => source.shared_string(index)?,
            Err(_) => fact.raw_value.clone(),
        },
        CellKind::Number => match fact.raw_value.trim().parse::<f64>() {
            Ok(n) if n.is_finite() => {
                formatter.format(n, fact.number_format_id, fact.is_date_formatted)
            }
            _ => fact.raw_value.clone(),
        },
        CellKind::Boolean => {
            let raw = fact.raw_value.trim();
            if raw == "1" || raw.eq_ignore_ascii_case("true") {
                "True".to_string()
            } else {
                "False".to_string()
            }
        }
        CellKind::Error => format!("#ERROR:{}", fact.raw_value),
        // A formula whose cached result is itself a formula has nothing to show
        CellKind::Formula => match fact.cached_result() {
            Some(cached) if cached.kind != CellKind::Formula => {
                display_of(source, formatter, &cached)?
            }
            _ => String::new(),
        },
    };
    Ok(text)
}
