//! Folder ownership from `.owners` files

use anyhow::{Context, Result};
use colored::*;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

const OWNERS_FILE: &str = ".owners";

/// Owners per folder, keyed by the folder's path relative to `root`
///
/// Every `.owners` file below `root` contributes its non-empty lines. The
/// root folder itself is keyed as ".".
pub fn find_owners_per_directory(root: &Path) -> Result<BTreeMap<String, Vec<String>>> {
    let mut owners_per_folder = BTreeMap::new();

    for entry in WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && e.file_name() == OWNERS_FILE)
    {
        let content = fs::read_to_string(entry.path())
            .with_context(|| format!("Failed to read {}", entry.path().display()))?;
        let owners = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect();

        let folder = entry
            .path()
            .parent()
            .and_then(|parent| parent.strip_prefix(root).ok())
            .map(|relative| relative.to_string_lossy().replace('\\', "/"))
            .filter(|relative| !relative.is_empty())
            .unwrap_or_else(|| ".".to_string());

        owners_per_folder.insert(folder, owners);
    }

    Ok(owners_per_folder)
}

/// Render rows as a left-aligned table with a header separator
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let render_row = |cells: Vec<&str>| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    let mut lines = vec![render_row(headers.to_vec())];
    lines.push(
        widths
            .iter()
            .map(|width| "-".repeat(*width))
            .collect::<Vec<_>>()
            .join("-|-"),
    );
    for row in rows {
        lines.push(render_row(row.iter().map(String::as_str).collect()));
    }
    lines.join("\n")
}

pub fn list_command(path_to_root: &Path) -> Result<()> {
    if !path_to_root.is_dir() {
        anyhow::bail!("{} is not a directory", path_to_root.display());
    }

    let owners = find_owners_per_directory(path_to_root)?;
    if owners.is_empty() {
        println!(
            "{} No {} files found below {}",
            "→".cyan(),
            OWNERS_FILE,
            path_to_root.display()
        );
        return Ok(());
    }

    let rows: Vec<Vec<String>> = owners
        .into_iter()
        .map(|(folder, owners)| vec![folder, owners.join(", ")])
        .collect();
    println!("{}", render_table(&["Folder", "Owners"], &rows));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_find_owners_per_directory() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), ".owners", "platform-team\n");
        write(dir.path(), "services/billing/.owners", "alice\r\n\r\nbob\n");
        write(dir.path(), ".github/.owners", "devops\n");
        write(dir.path(), "services/billing/README.md", "not an owners file");

        let owners = find_owners_per_directory(dir.path()).unwrap();

        assert_eq!(owners.len(), 3);
        assert_eq!(owners["."], vec!["platform-team"]);
        assert_eq!(owners["services/billing"], vec!["alice", "bob"]);
        assert_eq!(owners[".github"], vec!["devops"]);
    }

    #[test]
    fn test_render_table() {
        let rows = vec![
            vec!["services/billing".to_string(), "alice, bob".to_string()],
            vec![".".to_string(), "platform-team".to_string()],
        ];
        let table = render_table(&["Folder", "Owners"], &rows);
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines[0], "Folder           | Owners");
        assert_eq!(lines[1], "-----------------|--------------");
        assert_eq!(lines[2], "services/billing | alice, bob");
        assert_eq!(lines[3], ".                | platform-team");
    }
}
