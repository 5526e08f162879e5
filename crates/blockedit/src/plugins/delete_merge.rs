use anyhow::Result;

use super::{Intent, Plugin};
use crate::editor::Editor;

/// Backspace at the start of a block joins it onto the line above: the
/// previous text block, or the deepest last item of a preceding list.
pub struct DeleteMergePlugin;

impl Plugin for DeleteMergePlugin {
    fn name(&self) -> &str {
        "delete-merge"
    }

    fn on_intent(&self, editor: &mut Editor, intent: &Intent) -> Result<bool> {
        if *intent != Intent::DeleteBackward {
            return Ok(false);
        }
        let Some(point) = editor.cursor() else {
            return Ok(false);
        };
        let Some(block) = editor.text_block_at(&point) else {
            return Ok(false);
        };
        if !editor.is_block_start(&point) || block.previous().is_none() {
            return Ok(false);
        }
        let Some(target) = editor.previous_text_block(&block) else {
            return Ok(false);
        };
        editor.join_lines(&target, &block);
        Ok(true)
    }
}
