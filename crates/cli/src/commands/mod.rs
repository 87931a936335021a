mod inspect;
mod list;
mod scan;

pub(crate) use inspect::inspect_command;
pub(crate) use list::list_command;
pub(crate) use scan::scan_command;
