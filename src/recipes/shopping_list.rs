use std::collections::BTreeMap;

use super::repo_types::CartLine;

pub const HEADER: &str = "Список продуктов к покупке:";
pub const FILENAME: &str = "shopping_cart.txt";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShoppingItem {
    pub name: String,
    pub measurement_unit: String,
    pub total: i64,
}

/// Ingredient totals for everything in a user's cart, sorted by name then unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShoppingList {
    items: Vec<ShoppingItem>,
}

/// Dictionary order key: case-insensitive, with `ё` filed under `е`.
fn sort_key(name: &str) -> String {
    name.to_lowercase().replace('ё', "е")
}

/// Sums amounts per distinct (name, unit) pair.
///
/// Different ingredient rows sharing a name and unit collapse into one item.
/// Names are ordered alphabetically; the exact spelling breaks ties.
pub fn aggregate<I>(lines: I) -> ShoppingList
where
    I: IntoIterator<Item = CartLine>,
{
    let mut totals: BTreeMap<(String, String, String), i64> = BTreeMap::new();
    for line in lines {
        *totals
            .entry((sort_key(&line.name), line.name, line.measurement_unit))
            .or_default() += i64::from(line.amount);
    }
    ShoppingList {
        items: totals
            .into_iter()
            .map(|((_, name, measurement_unit), total)| ShoppingItem {
                name,
                measurement_unit,
                total,
            })
            .collect(),
    }
}

impl ShoppingList {
    pub fn items(&self) -> &[ShoppingItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Report lines without the header.
    pub fn lines(&self) -> Vec<String> {
        self.items
            .iter()
            .map(|i| format!("- {} - {} {}", i.name, i.total, i.measurement_unit))
            .collect()
    }

    pub fn render(&self) -> String {
        let mut out = String::from(HEADER);
        out.push('\n');
        for line in self.lines() {
            out.push_str(&line);
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(name: &str, unit: &str, amount: i32) -> CartLine {
        CartLine {
            name: name.into(),
            measurement_unit: unit.into(),
            amount,
        }
    }

    #[test]
    fn empty_cart_has_no_lines() {
        let list = aggregate(Vec::new());
        assert!(list.is_empty());
        assert!(list.lines().is_empty());
        assert_eq!(list.render(), format!("{HEADER}\n"));
    }

    #[test]
    fn shared_ingredient_summed_once() {
        let list = aggregate(vec![
            line("мука", "г", 100),
            line("яйца", "шт", 2),
            line("мука", "г", 50),
        ]);
        assert_eq!(list.lines(), vec!["- мука - 150 г", "- яйца - 2 шт"]);
    }

    #[test]
    fn same_name_and_unit_across_rows_collapse() {
        let list = aggregate(vec![line("salt", "g", 5), line("salt", "g", 7)]);
        assert_eq!(list.items().len(), 1);
        assert_eq!(list.items()[0].total, 12);
    }

    #[test]
    fn same_name_different_unit_stay_apart_in_stable_order() {
        let list = aggregate(vec![
            line("milk", "ml", 200),
            line("milk", "cup", 1),
            line("butter", "g", 30),
        ]);
        assert_eq!(
            list.lines(),
            vec!["- butter - 30 g", "- milk - 1 cup", "- milk - 200 ml"]
        );
    }

    #[test]
    fn names_sort_alphabetically_regardless_of_case_and_yo() {
        let list = aggregate(vec![
            line("яйца", "шт", 3),
            line("Мука", "г", 200),
            line("ёжевика", "г", 100),
            line("масло", "г", 50),
        ]);
        assert_eq!(
            list.lines(),
            vec![
                "- ёжевика - 100 г",
                "- масло - 50 г",
                "- Мука - 200 г",
                "- яйца - 3 шт",
            ]
        );
    }

    #[test]
    fn totals_do_not_overflow_i32() {
        let list = aggregate(vec![
            line("water", "ml", i32::MAX),
            line("water", "ml", i32::MAX),
        ]);
        assert_eq!(list.items()[0].total, 2 * i64::from(i32::MAX));
    }

    #[test]
    fn render_puts_header_first() {
        let text = aggregate(vec![line("sugar", "g", 10)]).render();
        assert_eq!(text, format!("{HEADER}\n- sugar - 10 g\n"));
    }
}
