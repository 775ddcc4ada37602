//! Demo catalog for `seed` and for first launches against an empty database.

use quiz_core::model::{Category, CategoryId, Difficulty, Question, QuestionId, Quiz, QuizId};
use storage::repository::CatalogRepository;

struct DemoQuestion {
    prompt: &'static str,
    options: [&'static str; 4],
    correct: usize,
    explanation: &'static str,
}

struct DemoQuiz {
    id: u64,
    title: &'static str,
    questions: &'static [DemoQuestion],
}

struct DemoCategory {
    id: u64,
    folder: &'static str,
    difficulty: Difficulty,
    quizzes: &'static [DemoQuiz],
}

const CAPITALS: &[DemoQuestion] = &[
    DemoQuestion {
        prompt: "What is the capital of France?",
        options: ["Lyon", "Paris", "Marseille", "Nice"],
        correct: 1,
        explanation: "Paris has been the capital since the 10th century.",
    },
    DemoQuestion {
        prompt: "What is the capital of Spain?",
        options: ["Madrid", "Barcelona", "Seville", "Valencia"],
        correct: 0,
        explanation: "Madrid sits near the geographic centre of the country.",
    },
    DemoQuestion {
        prompt: "What is the capital of Italy?",
        options: ["Milan", "Naples", "Rome", "Turin"],
        correct: 2,
        explanation: "Rome became the capital in 1871.",
    },
    DemoQuestion {
        prompt: "What is the capital of Portugal?",
        options: ["Porto", "Braga", "Faro", "Lisbon"],
        correct: 3,
        explanation: "Lisbon lies at the mouth of the Tagus.",
    },
    DemoQuestion {
        prompt: "What is the capital of Poland?",
        options: ["Krakow", "Warsaw", "Gdansk", "Wroclaw"],
        correct: 1,
        explanation: "Warsaw replaced Krakow as capital around 1596.",
    },
    DemoQuestion {
        prompt: "What is the capital of Norway?",
        options: ["Oslo", "Bergen", "Trondheim", "Stavanger"],
        correct: 0,
        explanation: "Oslo sits at the head of the Oslofjord.",
    },
    DemoQuestion {
        prompt: "What is the capital of Austria?",
        options: ["Salzburg", "Graz", "Vienna", "Linz"],
        correct: 2,
        explanation: "Vienna lies on the Danube.",
    },
];

const RIVERS: &[DemoQuestion] = &[
    DemoQuestion {
        prompt: "Which river flows through Cairo?",
        options: ["Niger", "Congo", "Zambezi", "Nile"],
        correct: 3,
        explanation: "The Nile runs north through Cairo into the Mediterranean.",
    },
    DemoQuestion {
        prompt: "Which river flows through Budapest?",
        options: ["Danube", "Rhine", "Elbe", "Vistula"],
        correct: 0,
        explanation: "The Danube splits Buda from Pest.",
    },
    DemoQuestion {
        prompt: "Which is the longest river in South America?",
        options: ["Parana", "Amazon", "Orinoco", "Madeira"],
        correct: 1,
        explanation: "The Amazon is about 6,400 km long.",
    },
];

const ELEMENTS: &[DemoQuestion] = &[
    DemoQuestion {
        prompt: "Which element has the symbol O?",
        options: ["Gold", "Osmium", "Oxygen", "Oganesson"],
        correct: 2,
        explanation: "O is oxygen, atomic number 8.",
    },
    DemoQuestion {
        prompt: "Which element has the symbol Fe?",
        options: ["Iron", "Fluorine", "Fermium", "Francium"],
        correct: 0,
        explanation: "Fe comes from the Latin ferrum.",
    },
    DemoQuestion {
        prompt: "Which gas makes up most of Earth's atmosphere?",
        options: ["Oxygen", "Argon", "Carbon dioxide", "Nitrogen"],
        correct: 3,
        explanation: "Nitrogen is about 78% of dry air.",
    },
    DemoQuestion {
        prompt: "What is the atomic number of carbon?",
        options: ["4", "6", "8", "12"],
        correct: 1,
        explanation: "Carbon has six protons.",
    },
];

const CATALOG: &[DemoCategory] = &[
    DemoCategory {
        id: 1,
        folder: "geography",
        difficulty: Difficulty::Medium,
        quizzes: &[
            DemoQuiz {
                id: 1,
                title: "European capitals",
                questions: CAPITALS,
            },
            DemoQuiz {
                id: 2,
                title: "Rivers of the world",
                questions: RIVERS,
            },
        ],
    },
    DemoCategory {
        id: 2,
        folder: "science",
        difficulty: Difficulty::Easy,
        quizzes: &[DemoQuiz {
            id: 3,
            title: "Elements",
            questions: ELEMENTS,
        }],
    },
];

/// Upserts the demo catalog. Safe to run repeatedly.
///
/// Returns how many questions were written.
pub async fn seed_demo_catalog(
    catalog: &dyn CatalogRepository,
) -> Result<usize, Box<dyn std::error::Error>> {
    let mut written = 0;
    let mut next_question_id = 1_u64;

    for demo in CATALOG {
        let quiz_count = u32::try_from(demo.quizzes.len())?;
        let category = Category::new(
            CategoryId::new(demo.id),
            demo.folder,
            demo.difficulty,
            quiz_count,
        )?;
        catalog.upsert_category(&category).await?;

        for demo_quiz in demo.quizzes {
            let quiz = Quiz::new(
                QuizId::new(demo_quiz.id),
                category.id(),
                demo_quiz.title,
                u32::try_from(demo_quiz.questions.len())?,
            )?;
            catalog.upsert_quiz(&quiz).await?;

            for demo_question in demo_quiz.questions {
                let question = Question::new(
                    QuestionId::new(next_question_id),
                    quiz.id(),
                    demo_question.prompt,
                    demo_question.options.iter().map(|o| (*o).to_owned()).collect(),
                    demo_question.correct,
                    demo_question.explanation,
                )?;
                catalog.upsert_question(&question).await?;
                next_question_id += 1;
                written += 1;
            }
        }
    }

    log::info!("seeded {written} demo questions");
    Ok(written)
}
