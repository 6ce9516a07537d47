use std::io::IsTerminal;

use comfy_table::{presets::NOTHING, Attribute, Cell, Table};

use mediaplan_types::Volume;

use crate::format::{format_bytes, format_time};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct CliTableTheme {
    pub use_color: bool,
}

impl CliTableTheme {
    pub(crate) fn detect() -> Self {
        let is_tty = std::io::stdout().is_terminal();
        let no_color = std::env::var_os("NO_COLOR").is_some();
        resolve_table_theme(is_tty, no_color)
    }

    pub(crate) fn new_data_table(self, headers: &[&str]) -> Table {
        let mut table = Table::new();
        table.load_preset(NOTHING);
        let header_cells: Vec<Cell> = headers.iter().map(|h| self.bold_cell(h)).collect();
        table.set_header(header_cells);
        table
    }

    pub(crate) fn new_kv_table(self) -> Table {
        let mut table = Table::new();
        table.load_preset(NOTHING);
        table
    }

    fn bold_cell(self, text: &str) -> Cell {
        let mut cell = Cell::new(text);
        if self.use_color {
            cell = cell.add_attribute(Attribute::Bold);
        }
        cell
    }

    /// One row per volume with its counters and write times.
    pub(crate) fn volume_table(self, volumes: &[Volume], pool_name: impl Fn(&Volume) -> String) -> Table {
        let mut table =
            self.new_data_table(&["Volume", "Pool", "Status", "Jobs", "Files", "Bytes", "Last written"]);
        for vol in volumes {
            table.add_row(vec![
                Cell::new(&vol.name),
                Cell::new(pool_name(vol)),
                Cell::new(vol.status),
                Cell::new(vol.vol_jobs),
                Cell::new(vol.vol_files),
                Cell::new(format_bytes(vol.vol_bytes)),
                Cell::new(format_time(vol.last_written)),
            ]);
        }
        table
    }

    /// Field/value listing of a single volume.
    pub(crate) fn volume_details(self, vol: &Volume, pool_name: &str) -> Table {
        let mut table = self.new_kv_table();
        add_kv_row(&mut table, self, "Volume", &vol.name);
        add_kv_row(&mut table, self, "Pool", pool_name);
        add_kv_row(&mut table, self, "Status", vol.status);
        add_kv_row(&mut table, self, "Media type", &vol.media_type);
        add_kv_row(&mut table, self, "Storage", vol.storage.as_deref().unwrap_or("-"));
        add_kv_row(&mut table, self, "Jobs", vol.vol_jobs);
        add_kv_row(&mut table, self, "Bytes", format_bytes(vol.vol_bytes));
        add_kv_row(&mut table, self, "Recycled", vol.recycle_count);
        table
    }
}

fn resolve_table_theme(is_tty: bool, no_color: bool) -> CliTableTheme {
    CliTableTheme {
        use_color: is_tty && !no_color,
    }
}

pub(crate) fn add_kv_row(
    table: &mut Table,
    theme: CliTableTheme,
    field: &str,
    value: impl ToString,
) {
    table.add_row(vec![theme.bold_cell(field), Cell::new(value.to_string())]);
}
