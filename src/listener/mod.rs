pub mod serenity;
pub mod songbird;
