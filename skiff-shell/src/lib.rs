mod archive;
mod menu;
mod notify;
mod progress;
mod state;
mod tree;

pub use archive::{LibraryArchive, LibraryError};
pub use menu::{Menu, MenuBar, MenuCaps, MenuItem, standard_menu_bar};
pub use notify::{ChangeListener, ChangeNotifier, NotifyTrigger};
pub use progress::{MonitorConfig, MonitorError, ProgressMonitor};
pub use state::{HeaderState, TitleKey, ToggleSet};
pub use tree::{FileTree, NodeEntry, TreeError, TreeNode, TreeOptions};
