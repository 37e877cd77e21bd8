//! One-shot question command

use crate::chat::RagSession;
use crate::error::Result;
use crate::ui;

/// Ask `question` against `collection` and print the answer.
///
/// With `stream` set, fragments are printed as they arrive.
pub async fn cmd_ask(
    session: &mut RagSession,
    model_name: &str,
    collection: &str,
    question: &str,
    stream: bool,
) -> Result<String> {
    if stream {
        ui::answer_prefix(model_name);
        let answer = session
            .ask_streaming(question, collection, ui::fragment)
            .await?;
        println!();
        Ok(answer)
    } else {
        let answer = session.ask(question, collection).await?;
        ui::answer(model_name, &answer);
        Ok(answer)
    }
}
