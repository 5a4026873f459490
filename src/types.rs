#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum FolderStyle {
    Monthly,
    Yearly,
    Flat,
}

impl FolderStyle {
    pub fn as_str(&self) -> &str {
        match self {
            FolderStyle::Monthly => "monthly",
            FolderStyle::Yearly => "yearly",
            FolderStyle::Flat => "flat",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}
