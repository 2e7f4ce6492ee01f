use super::{Language, Localizer, MessageKey, FALLBACK_LANGUAGE};

/// Localizer backed by the built-in message catalog.
///
/// English and Russian are complete; the remaining languages fall back to
/// English until their catalogs land.
pub struct StaticLocalizer;

impl Localizer for StaticLocalizer {
    fn localize(&self, key: MessageKey, language: Language) -> String {
        template(key, language)
            .or_else(|| template(key, FALLBACK_LANGUAGE))
            .unwrap_or_default()
            .to_string()
    }
}

fn template(key: MessageKey, language: Language) -> Option<&'static str> {
    match language {
        Language::En => Some(english(key)),
        Language::Ru => Some(russian(key)),
        _ => None,
    }
}

fn english(key: MessageKey) -> &'static str {
    use MessageKey::*;
    match key {
        Welcome => "Ho ho ho! I help groups play Secret Santa. Create a game, invite friends and I will draw the pairs.",
        MenuCreateGame => "Create a game",
        MenuMyGames => "My games",
        MenuChangeLanguage => "Change language",
        CancelLabel => "Cancel",
        DoneLabel => "Done",

        ChooseLanguage => "Choose your language:",
        LanguageSaved => "Language saved.",

        AskGameName => "What should the game be called?",
        GameNameInvalid => "The name must be non-empty and at most 100 characters. Try again:",
        AskStartDate => "When does the game start? Send a date like 24.12.2026. It must be in the future and within 7 days.",
        DateFormatError => "I could not read that date. Please use the format dd.mm.yyyy:",
        StartDatePast => "The start date must be in the future. Try again:",
        StartDateTooFar => "The start date must be within the next 7 days. Try again:",
        AskEndDate => "When does the game end? Send a date like 31.12.2026. It must be after the start and within 3 months of it.",
        EndDateNotAfterStart => "The end date must be after the start date. Try again:",
        EndDateTooFar => "The end date must be within 3 months of the start. Try again:",
        AskPlayerName => "What name should other players see? (up to 50 characters)",
        PlayerNameInvalid => "The name must be non-empty and at most 50 characters. Try again:",
        AskWishlist => "Send wishlist lines one message at a time. Send \u{201c}{done}\u{201d} when you are finished.",
        WishlistLineAdded => "Added. Send more, or \u{201c}{done}\u{201d} to finish.",
        WishlistTooLong => "That would make your wishlist longer than 2000 characters. Send something shorter.",
        GameCreated => "The game \u{201c}{name}\u{201d} is recruiting! Share this link so others can join:\n{link}",
        JoinedGame => "You joined \u{201c}{name}\u{201d}. I will message you when the pairs are drawn.",

        GameNotFound => "I could not find that game. It may have been deleted.",
        GameAlreadyStarted => "That game has already started, so no one can join anymore.",
        AlreadyParticipant => "You are already in this game.",

        MyGamesHeader => "Your games:",
        MyGamesEmpty => "You are not in any running games. Create one or join by invite link!",
        ViewStatus => "Status",
        ViewStartDate => "Starts",
        ViewEndDate => "Ends",
        ViewParticipants => "Participants",
        YourGiftee => "You are the Secret Santa of {name}. Their wishlist:\n{wishlist}",
        StatusCreating => "being set up",
        StatusRecruiting => "recruiting",
        StatusInProgress => "in progress",
        StatusFinished => "finished",

        ButtonView => "Details",
        ButtonEditWishlist => "Edit wishlist",
        ButtonLeave => "Leave game",
        ButtonDelete => "Delete game",
        ButtonStartNow => "Start now",
        ButtonAnonMessage => "Message my giftee",

        LeftGame => "You left \u{201c}{name}\u{201d}.",
        OnlyCreatorError => "Only the game's creator can do that.",
        GameCancelledNotice => "The game \u{201c}{name}\u{201d} was cancelled by its creator.",
        GameDeleted => "The game \u{201c}{name}\u{201d} was deleted.",
        NotEnoughParticipants => "At least 3 participants are needed to start the game.",
        GameStartedNotice => "\u{201c}{name}\u{201d} has started! You are the Secret Santa of {giftee}.",
        GameFinishedNotice => "\u{201c}{name}\u{201d} is over. Time to reveal who gifted whom!",
        GameAbortedNotice => "\u{201c}{name}\u{201d} was cancelled: fewer than 3 people joined before the start date.",

        AskAnonMessage => "Write the message for your giftee. I will deliver it anonymously (up to 1000 characters).",
        AnonMessageTooLong => "That message is longer than 1000 characters. Send something shorter.",
        AnonMessageSent => "Delivered anonymously.",
        AnonMessageHeader => "Your Secret Santa says:\n{text}",

        FlowCancelled => "Cancelled.",
        NothingToCancel => "Nothing to cancel.",
        UnknownCommand => "I did not understand that. Use the menu below.",
    }
}

fn russian(key: MessageKey) -> &'static str {
    use MessageKey::*;
    match key {
        Welcome => "Хо-хо-хо! Я помогаю играть в Тайного Санту. Создайте игру, пригласите друзей, а я разыграю пары.",
        MenuCreateGame => "Создать игру",
        MenuMyGames => "Мои игры",
        MenuChangeLanguage => "Сменить язык",
        CancelLabel => "Отмена",
        DoneLabel => "Готово",

        ChooseLanguage => "Выберите язык:",
        LanguageSaved => "Язык сохранён.",

        AskGameName => "Как назовём игру?",
        GameNameInvalid => "Название должно быть непустым и не длиннее 100 символов. Попробуйте ещё раз:",
        AskStartDate => "Когда начнётся игра? Пришлите дату вида 24.12.2026. Она должна быть в будущем и не позже чем через 7 дней.",
        DateFormatError => "Не удалось разобрать дату. Используйте формат дд.мм.гггг:",
        StartDatePast => "Дата начала должна быть в будущем. Попробуйте ещё раз:",
        StartDateTooFar => "Дата начала должна быть в пределах 7 дней. Попробуйте ещё раз:",
        AskEndDate => "Когда игра закончится? Пришлите дату вида 31.12.2026. Она должна быть после начала и не позже чем через 3 месяца.",
        EndDateNotAfterStart => "Дата окончания должна быть после даты начала. Попробуйте ещё раз:",
        EndDateTooFar => "Дата окончания должна быть не позже чем через 3 месяца после начала. Попробуйте ещё раз:",
        AskPlayerName => "Какое имя будут видеть другие игроки? (до 50 символов)",
        PlayerNameInvalid => "Имя должно быть непустым и не длиннее 50 символов. Попробуйте ещё раз:",
        AskWishlist => "Присылайте пункты вишлиста по одному сообщению. Отправьте \u{ab}{done}\u{bb}, когда закончите.",
        WishlistLineAdded => "Добавлено. Присылайте ещё или \u{ab}{done}\u{bb}, чтобы закончить.",
        WishlistTooLong => "Вишлист стал бы длиннее 2000 символов. Пришлите что-нибудь короче.",
        GameCreated => "Игра \u{ab}{name}\u{bb} открыта для участников! Отправьте друзьям эту ссылку:\n{link}",
        JoinedGame => "Вы присоединились к игре \u{ab}{name}\u{bb}. Я напишу, когда пары будут разыграны.",

        GameNotFound => "Не удалось найти игру. Возможно, её удалили.",
        GameAlreadyStarted => "Игра уже началась, присоединиться больше нельзя.",
        AlreadyParticipant => "Вы уже участвуете в этой игре.",

        MyGamesHeader => "Ваши игры:",
        MyGamesEmpty => "Вы не участвуете ни в одной игре. Создайте свою или присоединитесь по ссылке!",
        ViewStatus => "Статус",
        ViewStartDate => "Начало",
        ViewEndDate => "Конец",
        ViewParticipants => "Участники",
        YourGiftee => "Вы — Тайный Санта для {name}. Вишлист:\n{wishlist}",
        StatusCreating => "создаётся",
        StatusRecruiting => "набор участников",
        StatusInProgress => "идёт",
        StatusFinished => "завершена",

        ButtonView => "Подробнее",
        ButtonEditWishlist => "Изменить вишлист",
        ButtonLeave => "Покинуть игру",
        ButtonDelete => "Удалить игру",
        ButtonStartNow => "Начать сейчас",
        ButtonAnonMessage => "Написать подопечному",

        LeftGame => "Вы покинули игру \u{ab}{name}\u{bb}.",
        OnlyCreatorError => "Это может сделать только создатель игры.",
        GameCancelledNotice => "Игра \u{ab}{name}\u{bb} отменена создателем.",
        GameDeleted => "Игра \u{ab}{name}\u{bb} удалена.",
        NotEnoughParticipants => "Для начала игры нужно не меньше 3 участников.",
        GameStartedNotice => "Игра \u{ab}{name}\u{bb} началась! Вы — Тайный Санта для {giftee}.",
        GameFinishedNotice => "Игра \u{ab}{name}\u{bb} завершена. Пора раскрыть, кто кому дарил!",
        GameAbortedNotice => "Игра \u{ab}{name}\u{bb} отменена: к дате начала набралось меньше 3 участников.",

        AskAnonMessage => "Напишите сообщение для подопечного. Я передам его анонимно (до 1000 символов).",
        AnonMessageTooLong => "Сообщение длиннее 1000 символов. Пришлите что-нибудь короче.",
        AnonMessageSent => "Передано анонимно.",
        AnonMessageHeader => "Ваш Тайный Санта пишет:\n{text}",

        FlowCancelled => "Отменено.",
        NothingToCancel => "Отменять нечего.",
        UnknownCommand => "Я не понял. Воспользуйтесь меню ниже.",
    }
}
