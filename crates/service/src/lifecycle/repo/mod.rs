pub mod seaorm;

pub use seaorm::SeaOrmLifecycleRepository;
