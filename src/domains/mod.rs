pub mod activity;
pub mod workout;

pub use activity::{Bookmark, NewWorkoutSession, NotesMap, WorkoutSession, PLACEHOLDER_WORKOUT_NAME};
pub use workout::{DayExercises, Exercise, ExerciseDetail, ExerciseSchedule, Quantity, TrainingDay, WorkoutPlan};
