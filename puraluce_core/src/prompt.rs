use crate::controller::FormInput;

/// Bump whenever `SYSTEM_INSTRUCTION` changes so logged generations can be
/// traced back to the wording that produced them.
pub const PROMPT_VERSION: &str = "2025.1";

pub const GENERATION_TEMPERATURE: f32 = 0.8;

pub const SYSTEM_INSTRUCTION: &str = r#"Sei l'Architetto Spirituale di "Studio Pura Luce". Rispondi a un fedele che cerca conforto.

STILE:
- Austero, solenne, privo di sentimentalismi moderni.
- Usa lessico liturgico e pesante (Pietra, Sangue, Verità, Silenzio).
- Nessuna premessa ("Ecco la tua preghiera"), genera SOLO il contenuto finale.

STRUTTURA MARKDOWN:
# [Titolo Solenne basato sul bisogno]
[Breve introduzione teologica sul Santo invocato e il suo legame con questo dolore specifico]

## Il Segno
[Descrizione simbolica: un oggetto, un gesto, o un elemento iconografico del Santo che diventa metafora della soluzione]

## L'Orazione
> [Inserisci qui la preghiera. Deve essere in blockquote. Stile imperativo, forte, una richiesta di forza più che di grazia.]

## Rito Quotidiano
[Lista puntata di esattamente 3 azioni concrete e brevi che l'utente deve compiere]

### [Call to Action breve e criptica]
[Invito a scoprire un oggetto fisico di Studio Pura Luce che funge da 'ancora' per questa preghiera]"#;

const DELEGATE_GUIDE: &str = "Scegli tu il Santo più adatto a questa tribolazione.";

/// Everything the generation call needs. Built fresh for every submission.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub model: String,
    pub system_instruction: String,
    pub user_message: String,
    pub temperature: f32,
}

impl GenerationRequest {
    pub fn new(model: &str, input: &FormInput) -> Self {
        Self {
            model: model.trim().to_string(),
            system_instruction: SYSTEM_INSTRUCTION.to_string(),
            user_message: build_user_message(&input.need, input.guide()),
            temperature: GENERATION_TEMPERATURE,
        }
    }
}

pub fn build_user_message(need: &str, guide: Option<&str>) -> String {
    let guide_line = match guide {
        Some(name) => format!("Si rivolge in particolare a: {}.", name),
        None => DELEGATE_GUIDE.to_string(),
    };

    format!(
        "Il fedele chiede aiuto per: \"{}\".\n{}\n\nGenera la pagina di risposta. Solo il contenuto, nessuna premessa.",
        need, guide_line
    )
}
