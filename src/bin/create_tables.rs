//! Drops and recreates every warehouse table.

fn main() {
    sparkify_dwh::app::main_with("create_tables", sparkify_dwh::app::create_tables);
}
