//! Integration tests for Layer 2: State management
//!
//! Tests for handle lifecycle, batched edits, and shared readers.
