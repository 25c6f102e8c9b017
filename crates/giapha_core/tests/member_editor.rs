use giapha_core::db::open_db_in_memory;
use giapha_core::{
    AccessError, AvatarChange, AvatarUpload, FsObjectStore, Gender, MemberEditor,
    MemberEditorError, MemberForm, MemberFormError, ObjectStore, ObjectStoreError,
    PersonRepository, ProfileRepository, Role, SqlitePersonRepository, SqliteProfileRepository,
    StaticIdentity, AVATAR_BUCKET, MAX_AVATAR_BYTES,
};
use rusqlite::Connection;
use std::cell::RefCell;
use uuid::Uuid;

const BASE_URL: &str = "https://cdn.example.test/storage";

#[derive(Default)]
struct FakeObjects {
    uploads: RefCell<Vec<(String, String, usize)>>,
    removals: RefCell<Vec<(String, Vec<String>)>>,
    fail_remove: bool,
}

impl ObjectStore for FakeObjects {
    fn upload(&self, bucket: &str, path: &str, bytes: &[u8]) -> Result<(), ObjectStoreError> {
        self.uploads
            .borrow_mut()
            .push((bucket.to_string(), path.to_string(), bytes.len()));
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("{BASE_URL}/{bucket}/{path}")
    }

    fn remove(&self, bucket: &str, paths: &[&str]) -> Result<(), ObjectStoreError> {
        self.removals.borrow_mut().push((
            bucket.to_string(),
            paths.iter().map(|path| path.to_string()).collect(),
        ));
        if self.fail_remove {
            return Err(ObjectStoreError::NotFound(paths.join(",")));
        }
        Ok(())
    }
}

fn conn_with_user(role: Role) -> (Connection, Uuid) {
    let conn = open_db_in_memory().unwrap();
    let user_id = Uuid::new_v4();
    SqliteProfileRepository::new(&conn)
        .set_role(user_id, role)
        .unwrap();
    (conn, user_id)
}

fn filled_form() -> MemberForm {
    let mut form = MemberForm::new("Nguyễn Thị Mai", Gender::Female);
    form.birth_day = Some(12);
    form.birth_month = Some(3);
    form.birth_year = Some(1968);
    form.is_in_law = true;
    form.note = "  Con dâu trưởng  ".to_string();
    form.phone_number = "0901234567".to_string();
    form.occupation = "Giáo viên".to_string();
    form.current_residence = "Huế".to_string();
    form
}

#[test]
fn admin_creates_member_with_private_details() {
    let (conn, admin) = conn_with_user(Role::Admin);
    let identities = StaticIdentity::signed_in(admin);
    let objects = FakeObjects::default();

    let id = MemberEditor::new(&conn, &identities, &objects)
        .save(&filled_form(), AvatarChange::Keep)
        .unwrap();

    let repo = SqlitePersonRepository::new(&conn);
    let person = repo.get_person(id).unwrap().unwrap();
    assert_eq!(person.full_name, "Nguyễn Thị Mai");
    assert_eq!(person.birth_year, Some(1968));
    assert!(person.is_in_law);
    assert_eq!(person.note.as_deref(), Some("Con dâu trưởng"));
    assert_eq!(person.avatar_url, None);

    let private = repo.get_private_details(id).unwrap().unwrap();
    assert_eq!(private.phone_number.as_deref(), Some("0901234567"));
    assert_eq!(private.occupation.as_deref(), Some("Giáo viên"));
    assert_eq!(private.current_residence.as_deref(), Some("Huế"));
}

#[test]
fn member_role_saves_public_fields_only() {
    let (conn, member) = conn_with_user(Role::Member);
    let identities = StaticIdentity::signed_in(member);
    let objects = FakeObjects::default();

    let id = MemberEditor::new(&conn, &identities, &objects)
        .save(&filled_form(), AvatarChange::Keep)
        .unwrap();

    let repo = SqlitePersonRepository::new(&conn);
    assert!(repo.get_person(id).unwrap().is_some());
    assert_eq!(repo.get_private_details(id).unwrap(), None);
}

#[test]
fn anonymous_save_is_rejected_before_any_write() {
    let conn = open_db_in_memory().unwrap();
    let identities = StaticIdentity::anonymous();
    let objects = FakeObjects::default();
    let upload = AvatarUpload {
        file_name: "mai.png".to_string(),
        bytes: vec![1, 2, 3],
    };

    let err = MemberEditor::new(&conn, &identities, &objects)
        .save(&filled_form(), AvatarChange::Replace(upload))
        .unwrap_err();

    assert!(matches!(
        err,
        MemberEditorError::Access(AccessError::Unauthenticated)
    ));
    assert!(objects.uploads.borrow().is_empty());
    assert!(SqlitePersonRepository::new(&conn)
        .list_persons()
        .unwrap()
        .is_empty());
}

#[test]
fn invalid_dates_block_upload_and_write() {
    let (conn, admin) = conn_with_user(Role::Admin);
    let identities = StaticIdentity::signed_in(admin);
    let objects = FakeObjects::default();
    let mut form = filled_form();
    form.set_deceased(true);
    form.death_year = Some(1960);
    let upload = AvatarUpload {
        file_name: "mai.png".to_string(),
        bytes: vec![1, 2, 3],
    };

    let err = MemberEditor::new(&conn, &identities, &objects)
        .save(&form, AvatarChange::Replace(upload))
        .unwrap_err();

    assert!(matches!(
        err,
        MemberEditorError::Validation(MemberFormError::DeathBeforeBirth)
    ));
    assert!(objects.uploads.borrow().is_empty());
}

#[test]
fn update_rewrites_record_and_private_row() {
    let (conn, admin) = conn_with_user(Role::Admin);
    let identities = StaticIdentity::signed_in(admin);
    let objects = FakeObjects::default();
    let editor = MemberEditor::new(&conn, &identities, &objects);
    let id = editor.save(&filled_form(), AvatarChange::Keep).unwrap();

    let repo = SqlitePersonRepository::new(&conn);
    let person = repo.get_person(id).unwrap().unwrap();
    let private = repo.get_private_details(id).unwrap();
    let mut form = MemberForm::from_person(&person, private.as_ref());
    assert_eq!(form.phone_number, "0901234567");

    form.set_deceased(true);
    form.death_day = Some(1);
    form.death_month = Some(1);
    form.death_year = Some(2021);
    form.occupation = String::new();
    let saved_id = editor.save(&form, AvatarChange::Keep).unwrap();
    assert_eq!(saved_id, id);

    let updated = repo.get_person(id).unwrap().unwrap();
    assert!(updated.is_deceased);
    assert_eq!(updated.death_year, Some(2021));
    let private = repo.get_private_details(id).unwrap().unwrap();
    assert_eq!(private.phone_number, None);
    assert_eq!(private.occupation, None);
    assert_eq!(private.current_residence.as_deref(), Some("Huế"));
    assert_eq!(repo.list_persons().unwrap().len(), 1);
}

#[test]
fn avatar_upload_stores_public_url() {
    let (conn, member) = conn_with_user(Role::Member);
    let identities = StaticIdentity::signed_in(member);
    let objects = FakeObjects::default();
    let upload = AvatarUpload {
        file_name: "Chan Dung.JPG".to_string(),
        bytes: vec![0xff; 64],
    };

    let id = MemberEditor::new(&conn, &identities, &objects)
        .save(&filled_form(), AvatarChange::Replace(upload))
        .unwrap();

    let uploads = objects.uploads.borrow();
    assert_eq!(uploads.len(), 1);
    let (bucket, path, size) = &uploads[0];
    assert_eq!(bucket, AVATAR_BUCKET);
    assert!(path.ends_with(".jpg"), "unexpected object path {path}");
    assert_eq!(*size, 64);

    let person = SqlitePersonRepository::new(&conn)
        .get_person(id)
        .unwrap()
        .unwrap();
    assert_eq!(
        person.avatar_url,
        Some(format!("{BASE_URL}/{AVATAR_BUCKET}/{path}"))
    );
}

#[test]
fn oversized_or_empty_avatar_is_rejected() {
    let (conn, admin) = conn_with_user(Role::Admin);
    let identities = StaticIdentity::signed_in(admin);
    let objects = FakeObjects::default();
    let editor = MemberEditor::new(&conn, &identities, &objects);

    let too_large = AvatarUpload {
        file_name: "big.png".to_string(),
        bytes: vec![0; MAX_AVATAR_BYTES + 1],
    };
    let err = editor
        .save(&filled_form(), AvatarChange::Replace(too_large))
        .unwrap_err();
    assert!(matches!(
        err,
        MemberEditorError::AvatarTooLarge { size, limit }
            if size == MAX_AVATAR_BYTES + 1 && limit == MAX_AVATAR_BYTES
    ));

    let empty = AvatarUpload {
        file_name: "empty.png".to_string(),
        bytes: Vec::new(),
    };
    let err = editor
        .save(&filled_form(), AvatarChange::Replace(empty))
        .unwrap_err();
    assert!(matches!(err, MemberEditorError::EmptyAvatar));
    assert!(objects.uploads.borrow().is_empty());
    assert!(SqlitePersonRepository::new(&conn)
        .list_persons()
        .unwrap()
        .is_empty());
}

#[test]
fn removing_avatar_deletes_stored_object_best_effort() {
    let (conn, admin) = conn_with_user(Role::Admin);
    let identities = StaticIdentity::signed_in(admin);
    let objects = FakeObjects {
        fail_remove: true,
        ..FakeObjects::default()
    };
    let editor = MemberEditor::new(&conn, &identities, &objects);
    let upload = AvatarUpload {
        file_name: "mai.webp".to_string(),
        bytes: vec![7; 16],
    };
    let id = editor
        .save(&filled_form(), AvatarChange::Replace(upload))
        .unwrap();
    let uploaded_path = objects.uploads.borrow()[0].1.clone();

    let repo = SqlitePersonRepository::new(&conn);
    let person = repo.get_person(id).unwrap().unwrap();
    let form = MemberForm::from_person(&person, None);
    assert_eq!(form.initial_avatar_url(), person.avatar_url.as_deref());

    editor.save(&form, AvatarChange::Remove).unwrap();

    assert_eq!(
        *objects.removals.borrow(),
        vec![(AVATAR_BUCKET.to_string(), vec![uploaded_path])]
    );
    assert_eq!(repo.get_person(id).unwrap().unwrap().avatar_url, None);
}

#[test]
fn remove_skips_storage_when_url_was_edited() {
    let (conn, admin) = conn_with_user(Role::Admin);
    let identities = StaticIdentity::signed_in(admin);
    let objects = FakeObjects::default();
    let editor = MemberEditor::new(&conn, &identities, &objects);

    let mut form = filled_form();
    form.avatar_url = format!("{BASE_URL}/{AVATAR_BUCKET}/old_1.png");
    let id = editor.save(&form, AvatarChange::Keep).unwrap();

    let person = SqlitePersonRepository::new(&conn)
        .get_person(id)
        .unwrap()
        .unwrap();
    let mut form = MemberForm::from_person(&person, None);
    form.avatar_url = "https://elsewhere.test/other.png".to_string();
    editor.save(&form, AvatarChange::Remove).unwrap();

    assert!(objects.removals.borrow().is_empty());
}

#[test]
fn filesystem_store_keeps_uploaded_avatar() {
    let (conn, member) = conn_with_user(Role::Member);
    let identities = StaticIdentity::signed_in(member);
    let root = tempfile::tempdir().unwrap();
    let objects = FsObjectStore::new(root.path(), BASE_URL);
    let upload = AvatarUpload {
        file_name: "anh.png".to_string(),
        bytes: b"png-bytes".to_vec(),
    };

    let id = MemberEditor::new(&conn, &identities, &objects)
        .save(&filled_form(), AvatarChange::Replace(upload))
        .unwrap();

    let person = SqlitePersonRepository::new(&conn)
        .get_person(id)
        .unwrap()
        .unwrap();
    let url = person.avatar_url.unwrap();
    let object_name = url.rsplit('/').next().unwrap();
    let stored = std::fs::read(root.path().join(AVATAR_BUCKET).join(object_name)).unwrap();
    assert_eq!(stored, b"png-bytes");
}
