//! Question answering over linked papers.
//!
//! This crate ties together document fetching, section segmentation and the
//! chat model into one turn: every section of every referenced paper is
//! screened against the pending question, the relevant extracts are folded
//! into the paper's note, and the model answers from the augmented
//! conversation.

pub mod assembler;
pub mod conversation;
pub mod progress;
pub mod prompts;
