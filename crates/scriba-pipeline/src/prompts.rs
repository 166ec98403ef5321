//! Fixed task instructions for the four stages and their critics.
//!
//! Instructions are in Russian because the service processes Russian-language
//! scientific articles and the completion model responds in the language it is
//! prompted in.

use scriba_types::Stage;

/// System instruction for a stage's producing agent.
pub fn instruction_for(stage: Stage) -> &'static str {
    match stage {
        Stage::Rubric => {
            "Ты — библиограф научного издательства. Определи рубрику научной \
             статьи по государственному рубрикатору научно-технической \
             информации (ГРНТИ). Укажи наиболее подходящую рубрику первого и \
             второго уровня и одним предложением обоснуй выбор."
        }
        Stage::Keyword => {
            "Ты — специалист по индексированию научных публикаций. Выдели из \
             текста статьи 5–10 ключевых слов и словосочетаний, отражающих её \
             тематику. Перечисли их через запятую, без нумерации и пояснений."
        }
        Stage::Normal => {
            "Ты — редактор научного журнала. Приведи текст статьи к \
             нормализованному виду: исправь опечатки и артефакты распознавания, \
             убери переносы строк внутри предложений, сохрани структуру и \
             терминологию. Верни только нормализованный текст."
        }
        Stage::Summary => {
            "Ты — научный референт. Составь краткое саммари статьи: цель \
             исследования, использованные методы и главные результаты. Не более \
             пяти предложений."
        }
    }
}

/// System instruction for a stage's critic.
///
/// Every critic is told to open its reply with a verdict marker so the
/// controller can parse the decision without a second completion call.
pub fn critic_instruction_for(stage: Stage) -> String {
    let task = match stage {
        Stage::Rubric => "определение рубрики по ГРНТИ",
        Stage::Keyword => "список ключевых слов",
        Stage::Normal => "нормализация текста",
        Stage::Summary => "краткое саммари",
    };
    format!(
        "Ты — строгий рецензент. Тебе дан текст научной статьи и результат \
         работы агента (задача: {task}). Оцени, корректно ли выполнена задача. \
         Если результат приемлем, ответь одним словом: APPROVED. Если есть \
         ошибки, начни ответ со слова REJECTED, затем с новой строки перечисли \
         конкретные замечания."
    )
}

/// Append a one-shot corrective note to an instruction.
///
/// Called on a revision attempt only; the critique is injected exactly once
/// because each attempt rebuilds the instruction from scratch.
pub fn with_critique(instruction: &str, critique: &str) -> String {
    format!(
        "{instruction}\n\nВНИМАНИЕ! Предыдущая попытка была отклонена:\n{critique}\n\n\
         Учти эти замечания и исправь ошибки!"
    )
}

/// The user-message body a critic reviews: article plus candidate artifact.
pub fn critic_user_message(article_text: &str, artifact: &str) -> String {
    format!("ТЕКСТ СТАТЬИ:\n{article_text}\n\nРЕЗУЛЬТАТ АГЕНТА:\n{artifact}")
}
