//! Output formatting utilities

use clap::ValueEnum;
use serde::Serialize;
use studbook_core::LineageNode;
use studbook_server::{HorseDetailDto, HorseListDto, OwnerDto, ParentDto};

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

pub fn print_json<T: Serialize + ?Sized>(data: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(data)?);
    Ok(())
}

/// Left-aligned columns separated by two spaces
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let headers: Vec<String> = headers.iter().map(ToString::to_string).collect();
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }
    let separator: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();

    let line = |cells: &[String]| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = width))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    std::iter::once(&headers)
        .chain(std::iter::once(&separator))
        .chain(rows)
        .map(|row| line(row.as_slice()))
        .collect::<Vec<_>>()
        .join("\n")
}

fn owner_name(owner: &Option<OwnerDto>) -> String {
    owner
        .as_ref()
        .map(|o| format!("{} {}", o.first_name, o.last_name))
        .unwrap_or_default()
}

pub fn horse_table(horses: &[HorseListDto]) -> String {
    let rows: Vec<Vec<String>> = horses
        .iter()
        .map(|h| {
            vec![
                h.id.to_string(),
                h.name.clone(),
                h.date_of_birth.to_string(),
                h.sex.to_string(),
                owner_name(&h.owner),
                h.description.clone().unwrap_or_default(),
            ]
        })
        .collect();
    render_table(&["ID", "NAME", "BORN", "SEX", "OWNER", "DESCRIPTION"], &rows)
}

pub fn horse_detail(horse: &HorseDetailDto) -> String {
    let parent = |p: &Option<ParentDto>| {
        p.as_ref()
            .map(|p| format!("{} (#{})", p.name, p.id))
            .unwrap_or_else(|| "-".to_string())
    };

    let mut lines = vec![
        format!("Horse #{}: {}", horse.id, horse.name),
        format!("  Born:   {}", horse.date_of_birth),
        format!("  Sex:    {}", horse.sex),
    ];
    if let Some(description) = &horse.description {
        lines.push(format!("  About:  {}", description));
    }
    if horse.owner.is_some() {
        lines.push(format!("  Owner:  {}", owner_name(&horse.owner)));
    }
    lines.push(format!("  Mother: {}", parent(&horse.mother)));
    lines.push(format!("  Father: {}", parent(&horse.father)));
    lines.join("\n")
}

pub fn owner_table(owners: &[OwnerDto]) -> String {
    let rows: Vec<Vec<String>> = owners
        .iter()
        .map(|o| {
            vec![
                o.id.to_string(),
                o.first_name.clone(),
                o.last_name.clone(),
                o.email.clone().unwrap_or_default(),
            ]
        })
        .collect();
    render_table(&["ID", "FIRST NAME", "LAST NAME", "EMAIL"], &rows)
}

/// Draw a lineage tree with box-drawing connectors, mother before father
pub fn lineage_tree(root: &LineageNode) -> String {
    let mut lines = vec![node_label(root)];
    push_parents(root, "", &mut lines);
    lines.join("\n")
}

fn node_label(node: &LineageNode) -> String {
    format!("{} (#{}, {}, {})", node.name, node.id, node.date_of_birth, node.sex)
}

fn push_parents(node: &LineageNode, prefix: &str, lines: &mut Vec<String>) {
    let parents: Vec<(&str, &LineageNode)> = [("mother", &node.mother), ("father", &node.father)]
        .into_iter()
        .filter_map(|(role, parent)| parent.as_deref().map(|p| (role, p)))
        .collect();

    let count = parents.len();
    for (i, (role, parent)) in parents.into_iter().enumerate() {
        let last = i + 1 == count;
        let (branch, indent) = if last { ("└── ", "    ") } else { ("├── ", "│   ") };
        lines.push(format!("{}{}{}: {}", prefix, branch, role, node_label(parent)));
        push_parents(parent, &format!("{}{}", prefix, indent), lines);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use studbook_core::{HorseId, Sex};

    fn node(id: i64, name: &str, sex: Sex) -> LineageNode {
        LineageNode {
            id: HorseId(id),
            name: name.to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(2000 + id as i32, 1, 1).unwrap(),
            sex,
            mother: None,
            father: None,
        }
    }

    #[test]
    fn test_render_table_pads_columns() {
        let table = render_table(
            &["ID", "NAME"],
            &[vec!["1".into(), "Wendy".into()], vec!["12".into(), "Al".into()]],
        );
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "ID  NAME");
        assert_eq!(lines[1], "--  -----");
        assert_eq!(lines[2], "1   Wendy");
        assert_eq!(lines[3], "12  Al");
    }

    #[test]
    fn test_lineage_tree_connectors() {
        let mut dam = node(2, "Dam", Sex::Female);
        dam.father = Some(Box::new(node(4, "Grandsire", Sex::Male)));
        let mut root = node(1, "Foal", Sex::Female);
        root.mother = Some(Box::new(dam));
        root.father = Some(Box::new(node(3, "Sire", Sex::Male)));

        let rendered = lineage_tree(&root);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("Foal (#1"));
        assert!(lines[1].starts_with("├── mother: Dam"));
        assert!(lines[2].starts_with("│   └── father: Grandsire"));
        assert!(lines[3].starts_with("└── father: Sire"));
    }
}
