mod command;
mod markdown;

pub use command::CommandCommentary;
pub use markdown::MarkdownExporter;
