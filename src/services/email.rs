use lettre::{
    message::{header::ContentType, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use uuid::Uuid;

use crate::config::Config;

pub struct EmailService {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    admin_notify: Option<Mailbox>,
}

impl EmailService {
    /// Returns None if SMTP is not fully configured.
    pub fn new(config: &Config) -> Option<Self> {
        let host = config.smtp_host.as_deref()?;
        let username = config.smtp_username.clone()?;
        let password = config.smtp_password.clone()?;
        let from_addr = config.smtp_from.as_deref()?;

        let port = config.smtp_port.unwrap_or(587);
        let creds = Credentials::new(username, password);

        let transport = if port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host)
                .ok()?
                .credentials(creds)
                .build()
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                .ok()?
                .credentials(creds)
                .build()
        };

        let from: Mailbox = from_addr.parse().ok()?;
        let admin_notify = config
            .admin_notify_email
            .as_deref()
            .and_then(|a| a.parse().ok());

        Some(Self {
            transport,
            from,
            admin_notify,
        })
    }

    /// Notifie l'admin qu'une nouvelle demande (parent ou enseignant) attend
    /// une décision.
    pub async fn send_new_request_notification(
        &self,
        kind: &str,
        applicant_name: &str,
        applicant_email: &str,
    ) -> anyhow::Result<()> {
        let Some(to) = self.admin_notify.clone() else {
            return Ok(());
        };
        let subject = format!("Nouvelle demande {kind} : {applicant_name}");
        let text = format!(
            "Une nouvelle demande {kind} vient d'être déposée.\n\n\
             Nom : {applicant_name}\nEmail : {applicant_email}\n\n\
             Connectez-vous au tableau de bord pour l'examiner."
        );
        let html = format!(
            "<p>Une nouvelle demande <strong>{kind}</strong> vient d'être déposée.</p>\
             <p>Nom : {applicant_name}<br>Email : {applicant_email}</p>\
             <p>Connectez-vous au tableau de bord pour l'examiner.</p>"
        );
        self.send(to, &subject, &text, &html).await
    }

    /// Informe un candidat de la décision prise sur sa demande.
    pub async fn send_decision_email(
        &self,
        to_email: &str,
        name: &str,
        approved: bool,
    ) -> anyhow::Result<()> {
        let to: Mailbox = to_email.parse()?;
        let (subject, text, html) = if approved {
            (
                "Votre demande a été approuvée".to_string(),
                format!(
                    "Bonjour {name},\n\nVotre demande a été approuvée. \
                     Vous pouvez maintenant vous connecter à votre espace."
                ),
                format!(
                    "<p>Bonjour {name},</p><p>Votre demande a été <strong>approuvée</strong>. \
                     Vous pouvez maintenant vous connecter à votre espace.</p>"
                ),
            )
        } else {
            (
                "Votre demande n'a pas été retenue".to_string(),
                format!(
                    "Bonjour {name},\n\nAprès examen, nous ne pouvons pas donner suite \
                     à votre demande."
                ),
                format!(
                    "<p>Bonjour {name},</p><p>Après examen, nous ne pouvons pas donner \
                     suite à votre demande.</p>"
                ),
            )
        };
        self.send(to, &subject, &text, &html).await
    }

    /// Prévient le parent qu'un enseignant a été assigné à son rendez-vous.
    pub async fn send_assignment_notification(
        &self,
        parent_email: &str,
        parent_name: &str,
        teacher_name: &str,
        subject_taught: &str,
    ) -> anyhow::Result<()> {
        let to: Mailbox = parent_email.parse()?;
        let subject = format!("Un enseignant a été assigné — {subject_taught}");
        let text = format!(
            "Bonjour {parent_name},\n\n{teacher_name} a été assigné(e) à votre \
             rendez-vous de {subject_taught}. Vous recevrez une confirmation de \
             l'enseignant prochainement."
        );
        let html = format!(
            "<p>Bonjour {parent_name},</p><p><strong>{teacher_name}</strong> a été \
             assigné(e) à votre rendez-vous de {subject_taught}. Vous recevrez une \
             confirmation de l'enseignant prochainement.</p>"
        );
        self.send(to, &subject, &text, &html).await
    }

    fn new_message_id(&self) -> String {
        format!("<{}@{}>", Uuid::new_v4(), self.from.email.domain())
    }

    async fn send(
        &self,
        to: Mailbox,
        subject: &str,
        text: &str,
        html: &str,
    ) -> anyhow::Result<()> {
        let email = Message::builder()
            .message_id(Some(self.new_message_id()))
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html.to_string()),
                    ),
            )?;

        self.transport.send(email).await?;
        Ok(())
    }
}
