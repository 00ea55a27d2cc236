use std::sync::Arc;

use course_core::model::{Course, CourseId, CourseOutline, Enrollment, EnrollmentKey, LessonId, QuizId};
use course_core::{Progress, compute_progress, score_quiz};
use storage::repository::{CatalogRepository, EnrollmentRepository, Recorded, StorageError};

use super::session::StudentSession;
use super::view::{CourseProgressView, DashboardEntry, LessonCompletion, QuizSubmission};
use crate::Clock;
use crate::error::EnrollmentServiceError;
use crate::notify::{NotificationSink, ProgressEvent, TracingNotifier};

/// Owns the enrollment transitions and the read views derived from them.
///
/// Progress is recomputed from the stored completion sets against the
/// catalog on every call. Each transition is a single atomic repository
/// write, so concurrent calls for the same enrollment never drop a
/// completion.
#[derive(Clone)]
pub struct EnrollmentService {
    clock: Clock,
    catalog: Arc<dyn CatalogRepository>,
    enrollments: Arc<dyn EnrollmentRepository>,
    notifier: Arc<dyn NotificationSink>,
}

impl EnrollmentService {
    #[must_use]
    pub fn new(
        clock: Clock,
        catalog: Arc<dyn CatalogRepository>,
        enrollments: Arc<dyn EnrollmentRepository>,
    ) -> Self {
        Self {
            clock,
            catalog,
            enrollments,
            notifier: Arc::new(TracingNotifier),
        }
    }

    /// Replace the default `TracingNotifier`.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn NotificationSink>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Enroll the session's student in `course`.
    ///
    /// # Errors
    ///
    /// Returns `CourseNotFound` if the course is not in the catalog.
    /// Returns `AlreadyEnrolled` if the enrollment exists.
    /// Returns `Storage` if repository access fails.
    pub async fn enroll(
        &self,
        session: &StudentSession,
        course: CourseId,
    ) -> Result<Enrollment, EnrollmentServiceError> {
        self.load_course(course).await?;

        let key = session.key(course);
        let enrollment = Enrollment::new(key, self.clock.now());
        match self.enrollments.insert_enrollment(&enrollment).await {
            Ok(()) => {}
            Err(StorageError::Conflict) => {
                return Err(EnrollmentServiceError::AlreadyEnrolled {
                    student: key.student,
                    course,
                });
            }
            Err(err) => return Err(err.into()),
        }

        tracing::info!(%key, "student enrolled");
        Ok(enrollment)
    }

    /// Mark `lesson` completed and make it the last visited lesson.
    ///
    /// Completing a lesson twice leaves the set unchanged but still moves the
    /// last visited pointer.
    ///
    /// # Errors
    ///
    /// Returns `CourseNotFound`, `LessonNotInCourse` or `EnrollmentNotFound`
    /// when a reference does not resolve; nothing is written in that case.
    /// Returns `Storage` if repository access fails.
    pub async fn complete_lesson(
        &self,
        session: &StudentSession,
        course: CourseId,
        lesson: LessonId,
    ) -> Result<LessonCompletion, EnrollmentServiceError> {
        let outline = self.load_course(course).await?.outline();
        if !outline.contains_lesson(lesson) {
            return Err(EnrollmentServiceError::LessonNotInCourse { lesson, course });
        }

        let key = session.key(course);
        let recorded = self
            .enrollments
            .record_lesson_completion(key, lesson, self.clock.now())
            .await
            .map_err(|err| not_enrolled(key, err))?;

        let progress = compute_progress(&recorded.enrollment, &outline);
        tracing::debug!(%key, %lesson, inserted = recorded.inserted, progress = progress.percent(), "lesson completion recorded");

        self.emit(ProgressEvent::LessonCompleted {
            student: key.student,
            course,
            lesson,
            progress,
        })
        .await;
        self.emit_unlock(key, &recorded, progress).await;

        Ok(LessonCompletion::new(&recorded.enrollment, progress))
    }

    /// Record a client-reported score for `quiz`.
    ///
    /// The score must lie in `0..=question count`; a repeat submission
    /// overwrites the previous score.
    ///
    /// # Errors
    ///
    /// Returns `InvalidScore` before touching the enrollment when the score is
    /// out of range.
    /// Returns `CourseNotFound`, `QuizNotInCourse` or `EnrollmentNotFound`
    /// when a reference does not resolve.
    /// Returns `Storage` if repository access fails.
    pub async fn submit_quiz(
        &self,
        session: &StudentSession,
        course: CourseId,
        quiz: QuizId,
        score: i64,
    ) -> Result<QuizSubmission, EnrollmentServiceError> {
        let outline = self.load_course(course).await?.outline();
        let max = outline
            .question_count(quiz)
            .ok_or(EnrollmentServiceError::QuizNotInCourse { quiz, course })?;

        let valid = u32::try_from(score)
            .ok()
            .filter(|s| usize::try_from(*s).is_ok_and(|s| s <= max));
        let Some(score) = valid else {
            return Err(EnrollmentServiceError::InvalidScore { quiz, score, max });
        };

        self.record_quiz(session.key(course), &outline, quiz, score)
            .await
    }

    /// Grade raw answers server-side and record the resulting score.
    ///
    /// `responses[i]` answers question `i`; missing trailing responses count
    /// as wrong.
    ///
    /// # Errors
    ///
    /// Returns `Evaluation` when there are more responses than questions.
    /// Returns `CourseNotFound`, `QuizNotInCourse` or `EnrollmentNotFound`
    /// when a reference does not resolve.
    /// Returns `Storage` if repository access fails.
    pub async fn submit_quiz_answers(
        &self,
        session: &StudentSession,
        course: CourseId,
        quiz: QuizId,
        responses: &[Vec<String>],
    ) -> Result<QuizSubmission, EnrollmentServiceError> {
        let course_entry = self.load_course(course).await?;
        let definition = course_entry
            .find_quiz(quiz)
            .ok_or(EnrollmentServiceError::QuizNotInCourse { quiz, course })?;
        let graded = score_quiz(definition, responses)?;
        tracing::debug!(%quiz, correct = graded.correct, total = graded.total, "quiz graded");

        self.record_quiz(
            session.key(course),
            &course_entry.outline(),
            quiz,
            graded.correct,
        )
        .await
    }

    /// Current progress of the session's student in `course`.
    ///
    /// # Errors
    ///
    /// Returns `CourseNotFound` or `EnrollmentNotFound` when either is missing.
    /// Returns `Storage` if repository access fails.
    pub async fn get_progress(
        &self,
        session: &StudentSession,
        course: CourseId,
    ) -> Result<Progress, EnrollmentServiceError> {
        let outline = self.load_course(course).await?.outline();
        let enrollment = self.load_enrollment(session.key(course)).await?;
        Ok(compute_progress(&enrollment, &outline))
    }

    /// Whether a certificate can be issued right now.
    ///
    /// Reloads the enrollment and the catalog; true only at exactly 100 %.
    ///
    /// # Errors
    ///
    /// Returns `CourseNotFound` or `EnrollmentNotFound` when either is missing.
    /// Returns `Storage` if repository access fails.
    pub async fn is_certificate_eligible(
        &self,
        session: &StudentSession,
        course: CourseId,
    ) -> Result<bool, EnrollmentServiceError> {
        let progress = self.get_progress(session, course).await?;
        Ok(progress.is_complete())
    }

    /// # Errors
    ///
    /// Returns `CourseNotFound` or `EnrollmentNotFound` when either is missing.
    /// Returns `Storage` if repository access fails.
    pub async fn course_progress(
        &self,
        session: &StudentSession,
        course: CourseId,
    ) -> Result<CourseProgressView, EnrollmentServiceError> {
        let course_entry = self.load_course(course).await?;
        let enrollment = self.load_enrollment(session.key(course)).await?;
        let progress = compute_progress(&enrollment, &course_entry.outline());
        Ok(CourseProgressView::build(&course_entry, &enrollment, progress))
    }

    /// All enrollments of the student, ordered by course id.
    ///
    /// Enrollments whose course has left the catalog are skipped.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if repository access fails.
    pub async fn dashboard(
        &self,
        session: &StudentSession,
    ) -> Result<Vec<DashboardEntry>, EnrollmentServiceError> {
        let enrollments = self.enrollments.list_enrollments(session.student()).await?;

        let mut entries = Vec::with_capacity(enrollments.len());
        for enrollment in enrollments {
            let Some(course) = self.catalog.get_course(enrollment.course()).await? else {
                tracing::warn!(key = %enrollment.key(), "enrollment references a missing course");
                continue;
            };
            let progress = compute_progress(&enrollment, &course.outline());
            entries.push(DashboardEntry::new(&course, progress));
        }
        Ok(entries)
    }

    async fn record_quiz(
        &self,
        key: EnrollmentKey,
        outline: &CourseOutline,
        quiz: QuizId,
        score: u32,
    ) -> Result<QuizSubmission, EnrollmentServiceError> {
        let recorded = self
            .enrollments
            .record_quiz_submission(key, quiz, score, self.clock.now())
            .await
            .map_err(|err| not_enrolled(key, err))?;

        let progress = compute_progress(&recorded.enrollment, outline);
        tracing::debug!(%key, %quiz, score, inserted = recorded.inserted, progress = progress.percent(), "quiz submission recorded");

        self.emit(ProgressEvent::QuizSubmitted {
            student: key.student,
            course: key.course,
            quiz,
            score,
            progress,
        })
        .await;
        self.emit_unlock(key, &recorded, progress).await;

        Ok(QuizSubmission::new(&recorded.enrollment, quiz, score, progress))
    }

    async fn load_course(&self, course: CourseId) -> Result<Course, EnrollmentServiceError> {
        self.catalog
            .get_course(course)
            .await?
            .ok_or(EnrollmentServiceError::CourseNotFound(course))
    }

    async fn load_enrollment(
        &self,
        key: EnrollmentKey,
    ) -> Result<Enrollment, EnrollmentServiceError> {
        self.enrollments
            .get_enrollment(key)
            .await?
            .ok_or(EnrollmentServiceError::EnrollmentNotFound {
                student: key.student,
                course: key.course,
            })
    }

    /// A newly inserted member of the course's current content can only reach
    /// 100 % from below. Repeats never fire; content added later can reopen
    /// the course and fire it again.
    async fn emit_unlock(&self, key: EnrollmentKey, recorded: &Recorded, progress: Progress) {
        if recorded.inserted && progress.is_complete() {
            tracing::info!(%key, "certificate unlocked");
            self.emit(ProgressEvent::CertificateUnlocked {
                student: key.student,
                course: key.course,
            })
            .await;
        }
    }

    async fn emit(&self, event: ProgressEvent) {
        if let Err(err) = self.notifier.notify(&event).await {
            tracing::warn!(event = event.name(), error = %err, "notification sink failed");
        }
    }
}

fn not_enrolled(key: EnrollmentKey, err: StorageError) -> EnrollmentServiceError {
    match err {
        StorageError::NotFound => EnrollmentServiceError::EnrollmentNotFound {
            student: key.student,
            course: key.course,
        },
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use course_core::model::{
        Lesson, LessonKind, Module, ModuleId, Question, QuestionKind, Quiz, StudentId,
    };
    use course_core::time::fixed_now;
    use storage::repository::InMemoryRepository;

    use super::*;
    use crate::error::NotifyError;
    use crate::notify::NoopNotifier;

    const COURSE: CourseId = CourseId::new(1);
    const QUIZ: QuizId = QuizId::new(31);

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<ProgressEvent>>,
    }

    impl RecordingSink {
        fn unlocks(&self) -> usize {
            self.events
                .lock()
                .unwrap()
                .iter()
                .filter(|e| matches!(e, ProgressEvent::CertificateUnlocked { .. }))
                .count()
        }
    }

    #[async_trait]
    impl NotificationSink for RecordingSink {
        async fn notify(&self, event: &ProgressEvent) -> Result<(), NotifyError> {
            self.events.lock().unwrap().push(event.clone());
            Ok(())
        }
    }

    struct FailingSink;

    #[async_trait]
    impl NotificationSink for FailingSink {
        async fn notify(&self, _event: &ProgressEvent) -> Result<(), NotifyError> {
            Err(NotifyError::Delivery("mailer offline".into()))
        }
    }

    fn question(answer: &str) -> Question {
        Question {
            text: format!("Pick {answer}"),
            kind: QuestionKind::SingleChoice,
            options: vec!["a".into(), "b".into()],
            correct_answers: BTreeSet::from([answer.to_string()]),
        }
    }

    /// Two lessons and one five-question quiz.
    fn course(id: CourseId) -> Course {
        Course {
            id,
            title: "Intro to Rust".into(),
            description: None,
            modules: vec![Module {
                id: ModuleId::new(1),
                title: "Basics".into(),
                lessons: vec![
                    Lesson {
                        id: LessonId::new(11),
                        title: "Ownership".into(),
                        kind: LessonKind::Video,
                    },
                    Lesson {
                        id: LessonId::new(12),
                        title: "Borrowing".into(),
                        kind: LessonKind::Text,
                    },
                ],
                quizzes: vec![Quiz {
                    id: QUIZ,
                    title: "Basics check".into(),
                    questions: ["a", "b", "a", "b", "a"].into_iter().map(question).collect(),
                }],
            }],
        }
    }

    async fn setup(notifier: Arc<dyn NotificationSink>) -> (InMemoryRepository, EnrollmentService) {
        let repo = InMemoryRepository::new();
        repo.upsert_course(&course(COURSE)).await.unwrap();
        let service = EnrollmentService::new(
            Clock::fixed(fixed_now()),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
        )
        .with_notifier(notifier);
        (repo, service)
    }

    fn session() -> StudentSession {
        StudentSession::new(StudentId::new(42))
    }

    #[tokio::test]
    async fn enroll_requires_course_and_rejects_duplicates() {
        let (_, service) = setup(Arc::new(NoopNotifier)).await;

        let err = service.enroll(&session(), CourseId::new(9)).await.unwrap_err();
        assert!(matches!(err, EnrollmentServiceError::CourseNotFound(_)));

        let enrollment = service.enroll(&session(), COURSE).await.unwrap();
        assert!(enrollment.completed_lessons().is_empty());

        let err = service.enroll(&session(), COURSE).await.unwrap_err();
        assert!(matches!(err, EnrollmentServiceError::AlreadyEnrolled { .. }));
    }

    #[tokio::test]
    async fn lessons_then_quiz_unlock_certificate() {
        let (_, service) = setup(Arc::new(NoopNotifier)).await;
        service.enroll(&session(), COURSE).await.unwrap();

        service
            .complete_lesson(&session(), COURSE, LessonId::new(11))
            .await
            .unwrap();
        let done = service
            .complete_lesson(&session(), COURSE, LessonId::new(12))
            .await
            .unwrap();
        assert_eq!(done.progress.rounded(2), 66.67);
        assert!(!service.is_certificate_eligible(&session(), COURSE).await.unwrap());

        let submitted = service.submit_quiz(&session(), COURSE, QUIZ, 4).await.unwrap();
        assert!(submitted.progress.is_complete());
        assert!(service.is_certificate_eligible(&session(), COURSE).await.unwrap());
    }

    #[tokio::test]
    async fn completing_a_lesson_twice_is_idempotent() {
        let (_, service) = setup(Arc::new(NoopNotifier)).await;
        service.enroll(&session(), COURSE).await.unwrap();

        let first = service
            .complete_lesson(&session(), COURSE, LessonId::new(11))
            .await
            .unwrap();
        service
            .complete_lesson(&session(), COURSE, LessonId::new(12))
            .await
            .unwrap();
        let again = service
            .complete_lesson(&session(), COURSE, LessonId::new(11))
            .await
            .unwrap();

        assert_eq!(first.completed_lessons.len(), 1);
        assert_eq!(again.completed_lessons.len(), 2);
        assert_eq!(again.last_visited_lesson, Some(LessonId::new(11)));
    }

    #[tokio::test]
    async fn progress_never_decreases_across_transitions() {
        let (_, service) = setup(Arc::new(NoopNotifier)).await;
        service.enroll(&session(), COURSE).await.unwrap();

        let mut last = service.get_progress(&session(), COURSE).await.unwrap();
        assert_eq!(last.percent(), 0.0);
        for lesson in [11, 11, 12, 12] {
            let step = service
                .complete_lesson(&session(), COURSE, LessonId::new(lesson))
                .await
                .unwrap();
            assert!(step.progress >= last);
            last = step.progress;
        }
        for score in [2, 0, 5] {
            let step = service.submit_quiz(&session(), COURSE, QUIZ, score).await.unwrap();
            assert!(step.progress >= last);
            last = step.progress;
        }
    }

    #[tokio::test]
    async fn unknown_references_are_rejected() {
        let (_, service) = setup(Arc::new(NoopNotifier)).await;

        let err = service
            .complete_lesson(&session(), COURSE, LessonId::new(11))
            .await
            .unwrap_err();
        assert!(matches!(err, EnrollmentServiceError::EnrollmentNotFound { .. }));
        assert!(err.is_not_found());

        service.enroll(&session(), COURSE).await.unwrap();
        let err = service
            .complete_lesson(&session(), COURSE, LessonId::new(7))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "lesson 7 does not belong to course 1");

        let err = service
            .submit_quiz(&session(), COURSE, QuizId::new(99), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, EnrollmentServiceError::QuizNotInCourse { .. }));
    }

    #[tokio::test]
    async fn out_of_range_scores_leave_enrollment_untouched() {
        let (repo, service) = setup(Arc::new(NoopNotifier)).await;
        let enrolled = service.enroll(&session(), COURSE).await.unwrap();

        for score in [-1, 6, i64::MAX] {
            let err = service
                .submit_quiz(&session(), COURSE, QUIZ, score)
                .await
                .unwrap_err();
            assert!(matches!(err, EnrollmentServiceError::InvalidScore { max: 5, .. }));
            assert!(err.is_invalid_argument());
        }

        let stored = repo.get_enrollment(session().key(COURSE)).await.unwrap().unwrap();
        assert_eq!(stored, enrolled);
    }

    #[tokio::test]
    async fn resubmission_overwrites_score() {
        let (_, service) = setup(Arc::new(NoopNotifier)).await;
        service.enroll(&session(), COURSE).await.unwrap();

        service.submit_quiz(&session(), COURSE, QUIZ, 3).await.unwrap();
        let second = service.submit_quiz(&session(), COURSE, QUIZ, 5).await.unwrap();

        assert_eq!(second.quiz_scores.get(&QUIZ), Some(&5));
        assert_eq!(second.completed_quizzes.len(), 1);
    }

    #[tokio::test]
    async fn raw_answers_are_graded_server_side() {
        let (_, service) = setup(Arc::new(NoopNotifier)).await;
        service.enroll(&session(), COURSE).await.unwrap();

        let responses = vec![
            vec!["a".to_string()],
            vec!["a".to_string()],
            vec!["a".to_string()],
        ];
        let graded = service
            .submit_quiz_answers(&session(), COURSE, QUIZ, &responses)
            .await
            .unwrap();
        assert_eq!(graded.score, 2);

        let too_many = vec![vec!["a".to_string()]; 6];
        let err = service
            .submit_quiz_answers(&session(), COURSE, QUIZ, &too_many)
            .await
            .unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[tokio::test]
    async fn progress_follows_catalog_changes() {
        let (repo, service) = setup(Arc::new(NoopNotifier)).await;
        service.enroll(&session(), COURSE).await.unwrap();
        for lesson in [11, 12] {
            service
                .complete_lesson(&session(), COURSE, LessonId::new(lesson))
                .await
                .unwrap();
        }
        service.submit_quiz(&session(), COURSE, QUIZ, 5).await.unwrap();

        let mut updated = course(COURSE);
        updated.modules[0].lessons.push(Lesson {
            id: LessonId::new(13),
            title: "Lifetimes".into(),
            kind: LessonKind::Document,
        });
        repo.upsert_course(&updated).await.unwrap();
        let progress = service.get_progress(&session(), COURSE).await.unwrap();
        assert_eq!(progress.percent(), 75.0);
        assert!(!service.is_certificate_eligible(&session(), COURSE).await.unwrap());

        updated.modules[0].lessons.retain(|l| l.id != LessonId::new(12));
        repo.upsert_course(&updated).await.unwrap();
        let progress = service.get_progress(&session(), COURSE).await.unwrap();
        assert!((progress.percent() - 200.0 / 3.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn empty_course_reports_zero() {
        let (repo, service) = setup(Arc::new(NoopNotifier)).await;
        let empty = Course {
            id: CourseId::new(2),
            title: "Coming soon".into(),
            description: None,
            modules: Vec::new(),
        };
        repo.upsert_course(&empty).await.unwrap();
        service.enroll(&session(), empty.id).await.unwrap();

        let progress = service.get_progress(&session(), empty.id).await.unwrap();
        assert_eq!(progress.percent(), 0.0);
        assert!(!service.is_certificate_eligible(&session(), empty.id).await.unwrap());
    }

    #[tokio::test]
    async fn certificate_unlock_is_announced_once() {
        let sink = Arc::new(RecordingSink::default());
        let (_, service) = setup(sink.clone()).await;
        service.enroll(&session(), COURSE).await.unwrap();

        service.submit_quiz(&session(), COURSE, QUIZ, 1).await.unwrap();
        service
            .complete_lesson(&session(), COURSE, LessonId::new(11))
            .await
            .unwrap();
        assert_eq!(sink.unlocks(), 0);

        service
            .complete_lesson(&session(), COURSE, LessonId::new(12))
            .await
            .unwrap();
        assert_eq!(sink.unlocks(), 1);

        service
            .complete_lesson(&session(), COURSE, LessonId::new(12))
            .await
            .unwrap();
        service.submit_quiz(&session(), COURSE, QUIZ, 5).await.unwrap();
        assert_eq!(sink.unlocks(), 1);
        assert_eq!(sink.events.lock().unwrap().len(), 6);
    }

    #[tokio::test]
    async fn certificate_unlock_fires_again_when_new_content_is_completed() {
        let sink = Arc::new(RecordingSink::default());
        let (repo, service) = setup(sink.clone()).await;
        service.enroll(&session(), COURSE).await.unwrap();
        for lesson in [11, 12] {
            service
                .complete_lesson(&session(), COURSE, LessonId::new(lesson))
                .await
                .unwrap();
        }
        service.submit_quiz(&session(), COURSE, QUIZ, 4).await.unwrap();
        assert_eq!(sink.unlocks(), 1);

        let mut extended = course(COURSE);
        extended.modules[0].lessons.push(Lesson {
            id: LessonId::new(13),
            title: "Traits".into(),
            kind: LessonKind::Text,
        });
        repo.upsert_course(&extended).await.unwrap();
        assert!(!service.is_certificate_eligible(&session(), COURSE).await.unwrap());

        service
            .complete_lesson(&session(), COURSE, LessonId::new(13))
            .await
            .unwrap();
        assert_eq!(sink.unlocks(), 2);
    }

    #[tokio::test]
    async fn sink_failures_do_not_fail_transitions() {
        let (repo, service) = setup(Arc::new(FailingSink)).await;
        service.enroll(&session(), COURSE).await.unwrap();

        service
            .complete_lesson(&session(), COURSE, LessonId::new(11))
            .await
            .unwrap();

        let stored = repo.get_enrollment(session().key(COURSE)).await.unwrap().unwrap();
        assert!(stored.completed_lessons().contains(&LessonId::new(11)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_completions_are_all_kept() {
        let repo = InMemoryRepository::new();
        let mut wide = course(COURSE);
        wide.modules[0].lessons = (100..116)
            .map(|id| Lesson {
                id: LessonId::new(id),
                title: format!("Lesson {id}"),
                kind: LessonKind::Text,
            })
            .collect();
        repo.upsert_course(&wide).await.unwrap();
        let service = EnrollmentService::new(
            Clock::fixed(fixed_now()),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
        );
        service.enroll(&session(), COURSE).await.unwrap();

        let handles: Vec<_> = (100..116)
            .map(|id| {
                let service = service.clone();
                tokio::spawn(async move {
                    service
                        .complete_lesson(&session(), COURSE, LessonId::new(id))
                        .await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let view = service.course_progress(&session(), COURSE).await.unwrap();
        assert_eq!(view.completed_lessons.len(), 16);
    }

    #[tokio::test]
    async fn course_progress_lists_pending_quizzes() {
        let (_, service) = setup(Arc::new(NoopNotifier)).await;
        service.enroll(&session(), COURSE).await.unwrap();
        service
            .complete_lesson(&session(), COURSE, LessonId::new(12))
            .await
            .unwrap();

        let view = service.course_progress(&session(), COURSE).await.unwrap();
        assert_eq!(view.last_visited_lesson, Some(LessonId::new(12)));
        assert_eq!(view.pending_quizzes.len(), 1);
        assert_eq!(view.pending_quizzes[0].quiz, QUIZ);
        assert!(!view.certificate_available);

        service.submit_quiz(&session(), COURSE, QUIZ, 2).await.unwrap();
        let view = service.course_progress(&session(), COURSE).await.unwrap();
        assert!(view.pending_quizzes.is_empty());
        assert_eq!(view.quiz_scores.get(&QUIZ), Some(&2));
    }

    #[tokio::test]
    async fn dashboard_skips_courses_missing_from_catalog() {
        let (repo, service) = setup(Arc::new(NoopNotifier)).await;
        repo.upsert_course(&course(CourseId::new(3))).await.unwrap();
        service.enroll(&session(), CourseId::new(3)).await.unwrap();
        service.enroll(&session(), COURSE).await.unwrap();
        repo.insert_enrollment(&Enrollment::new(session().key(CourseId::new(2)), fixed_now()))
            .await
            .unwrap();

        service
            .complete_lesson(&session(), COURSE, LessonId::new(11))
            .await
            .unwrap();

        let entries = service.dashboard(&session()).await.unwrap();
        let courses: Vec<_> = entries.iter().map(|e| e.course).collect();
        assert_eq!(courses, vec![COURSE, CourseId::new(3)]);
        assert_eq!(entries[0].band, course_core::ProgressBand::Fair);
        assert_eq!(entries[1].band, course_core::ProgressBand::Low);
    }
}
