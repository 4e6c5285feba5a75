pub mod bash;

pub use bash::ExecuteBashRequest;
