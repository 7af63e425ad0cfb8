pub mod pulumi;

pub use pulumi::PulumiCliRunner;
