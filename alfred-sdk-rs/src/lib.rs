pub mod agent;
pub mod audit;
pub mod config;
pub mod console;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod llm;
pub mod logger;
pub mod moderation;
pub mod prompts;
pub mod tail;
pub mod trigger;
